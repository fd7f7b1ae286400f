//! The main entry point: a client that wires the station registry, the
//! series cache and the derived columns together.

use crate::config::PipelineConfig;
use crate::derived::engine::DerivedColumnEngine;
use crate::derived::normal::{compute_normal, ClimateNormal};
use crate::error::NbcnError;
use crate::frames::station_view::{SpiralMode, SpiralPoint, StationView};
use crate::series::enriched::EnrichedSeries;
use crate::series::fetcher::RawSeriesFetcher;
use crate::series::merge_cache::{CacheState, MergeCache};
use crate::source::{ByteSource, HttpSource};
use crate::stations::catalog::StationCatalog;
use crate::stations::locate_station::StationLocator;
use crate::types::station::StationRecord;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A geographical coordinate: latitude first, longitude second.
///
/// # Examples
///
/// ```
/// use nbcn_climate::LatLon;
///
/// let zurich = LatLon(47.3769, 8.5417);
/// assert_eq!(zurich.0, 47.3769);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// Client for the NBCN daily climate records.
///
/// The historical part of every station is downloaded once and kept as a
/// parquet snapshot in the cache directory; the current part is downloaded on
/// every [`Nbcn::load_series`].
///
/// # Examples
///
/// ```no_run
/// # use nbcn_climate::{Nbcn, Resolution};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Nbcn::new().await?;
/// let series = client.load_series().await?;
/// let basel = series.select_station("BAS").within_years(1990, 2020);
/// println!("{}", basel.aggregate(Resolution::Year)?);
/// # Ok(())
/// # }
/// ```
pub struct Nbcn<S = HttpSource> {
    config: PipelineConfig,
    catalog: StationCatalog<S>,
    cache: MergeCache<S>,
    locator: OnceCell<StationLocator>,
}

impl Nbcn<HttpSource> {
    /// A client with the default settings, caching in the user's cache
    /// directory (e.g. `~/.cache/nbcn_climate_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`NbcnError::CacheDirResolution`] if no cache directory can be
    /// found and [`NbcnError::CacheDirCreation`] if it cannot be created.
    pub async fn new() -> Result<Self, NbcnError> {
        let cache_folder = get_cache_dir().map_err(NbcnError::CacheDirResolution)?;
        Self::with_cache_folder(cache_folder).await
    }

    /// A client with the default settings, caching in `cache_folder`.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, NbcnError> {
        Self::with_config(PipelineConfig::with_cache_dir(cache_folder), HttpSource::new()).await
    }
}

#[bon]
impl<S: ByteSource> Nbcn<S> {
    /// A client reading every remote file through `source`.
    pub async fn with_config(config: PipelineConfig, source: S) -> Result<Self, NbcnError> {
        ensure_cache_dir_exists(&config.cache_dir)
            .await
            .map_err(|e| NbcnError::CacheDirCreation(config.cache_dir.clone(), e))?;

        let source = Arc::new(source);
        let catalog = StationCatalog::new(Arc::clone(&source), config.registry_url.clone());
        let cache = MergeCache::new(
            RawSeriesFetcher::new(source, config.max_concurrent_fetches),
            DerivedColumnEngine::new(config.thresholds),
            config.snapshot_path(),
        )
        .with_batch_policy(config.batch_policy)
        .with_cache_fallback(config.fallback_on_cache_error);

        Ok(Self {
            config,
            catalog,
            cache,
            locator: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Every station of the registry, in registry order.
    pub async fn stations(&self) -> Result<Arc<Vec<StationRecord>>, NbcnError> {
        Ok(self.catalog.load().await?)
    }

    /// # Errors
    ///
    /// Returns [`NbcnError::StationNotFound`] if the registry has no station
    /// with this abbreviation.
    pub async fn station(&self, id: &str) -> Result<StationRecord, NbcnError> {
        self.catalog
            .station(id)
            .await?
            .ok_or_else(|| NbcnError::StationNotFound(id.to_string()))
    }

    /// Stations near `location`, closest first.
    ///
    /// * `.location(LatLon)`: **Required.**
    /// * `.max_distance_km(f64)`: search radius, defaults to `50.0`.
    /// * `.station_limit(usize)`: defaults to `5`.
    ///
    /// ```no_run
    /// # use nbcn_climate::{LatLon, Nbcn, NbcnError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), NbcnError> {
    /// let client = Nbcn::new().await?;
    /// let near_bern = client
    ///     .find_stations()
    ///     .location(LatLon(46.948, 7.447))
    ///     .station_limit(3)
    ///     .call()
    ///     .await?;
    /// assert!(near_bern.len() <= 3);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn find_stations(
        &self,
        location: LatLon,
        max_distance_km: Option<f64>,
        station_limit: Option<usize>,
    ) -> Result<Vec<StationRecord>, NbcnError> {
        let max_distance_km = max_distance_km.unwrap_or(50.0);
        let station_limit = station_limit.unwrap_or(5);

        let stations = self.catalog.load().await?;
        let locator = self
            .locator
            .get_or_init(|| async { StationLocator::new(&stations) })
            .await;

        Ok(locator
            .query(location.0, location.1, station_limit, max_distance_km)
            .into_iter()
            .map(|(station, _distance)| station)
            .collect())
    }

    /// Historical plus current rows of every registry station, enriched.
    pub async fn load_series(&self) -> Result<EnrichedSeries, NbcnError> {
        let stations = self.catalog.load().await?;
        Ok(self.cache.load(&stations).await?)
    }

    /// Loads the series and selects one station.
    ///
    /// # Errors
    ///
    /// Returns [`NbcnError::StationNotFound`] for an id that is not in the
    /// registry.
    pub async fn station_view(&self, id: &str) -> Result<StationView, NbcnError> {
        self.station(id).await?;
        Ok(self.load_series().await?.select_station(id))
    }

    /// The climate normal of a view, using the configured reference year.
    pub fn climate_normal(&self, view: &StationView) -> ClimateNormal {
        compute_normal(view.rows(), self.config.reference_year)
    }

    /// Spiral data of a view, using the configured reference year.
    pub fn spiral(&self, view: &StationView, mode: SpiralMode, current_year: i32) -> Vec<SpiralPoint> {
        view.spiral(mode, self.config.reference_year, current_year)
    }

    pub async fn cache_state(&self) -> CacheState {
        self.cache.state().await
    }

    /// Deletes the historical snapshot; the next load downloads it again.
    pub async fn invalidate_cache(&self) -> Result<(), NbcnError> {
        Ok(self.cache.invalidate().await?)
    }
}
