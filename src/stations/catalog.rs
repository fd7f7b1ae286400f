//! The NBCN station registry: one row per station with its metadata and the
//! URLs of its two data files.

use crate::series::frame::read_semicolon_csv;
use crate::source::{decode_windows_1252, ByteSource};
use crate::stations::error::StationCatalogError;
use crate::types::data_source::REGISTRY_COLUMNS;
use crate::types::station::StationRecord;
use crate::utils::parse_measurement;
use chrono::NaiveDate;
use log::{debug, info, warn};
use polars::prelude::*;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task;

pub const DEFAULT_REGISTRY_URL: &str =
    "https://data.geo.admin.ch/ch.meteoschweiz.klima/nbcn-tageswerte/liste-download-nbcn-d.csv";

/// Loads the station registry once per process and serves it afterwards.
pub struct StationCatalog<S> {
    source: Arc<S>,
    registry_url: String,
    stations: OnceCell<Arc<Vec<StationRecord>>>,
}

impl<S: ByteSource> StationCatalog<S> {
    pub fn new(source: Arc<S>, registry_url: impl Into<String>) -> Self {
        Self {
            source,
            registry_url: registry_url.into(),
            stations: OnceCell::new(),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    /// All stations in registry order.
    ///
    /// The first successful load is reused; a failed load is not cached, so a
    /// later call tries the source again.
    pub async fn load(&self) -> Result<Arc<Vec<StationRecord>>, StationCatalogError> {
        self.stations
            .get_or_try_init(|| async {
                let bytes = self.source.fetch(&self.registry_url).await.map_err(|e| {
                    StationCatalogError::SourceUnavailable {
                        url: self.registry_url.clone(),
                        source: e,
                    }
                })?;
                let stations = task::spawn_blocking(move || parse_registry(&bytes)).await??;
                info!("Loaded {} stations from the registry", stations.len());
                Ok::<_, StationCatalogError>(Arc::new(stations))
            })
            .await
            .cloned()
    }

    /// Looks a station up by its abbreviation (e.g. "BAS").
    pub async fn station(&self, id: &str) -> Result<Option<StationRecord>, StationCatalogError> {
        Ok(self.load().await?.iter().find(|s| s.id == id).cloned())
    }
}

/// Parses the registry by column position. Rows without a station name are
/// footnotes or padding and are dropped.
pub(crate) fn parse_registry(bytes: &[u8]) -> Result<Vec<StationRecord>, StationCatalogError> {
    let text = decode_windows_1252(bytes);
    let mut df = read_semicolon_csv(text).map_err(StationCatalogError::CsvRead)?;

    if df.width() != REGISTRY_COLUMNS.len() {
        warn!(
            "Registry column count ({}) does not match schema length ({})",
            df.width(),
            REGISTRY_COLUMNS.len()
        );
        return Err(StationCatalogError::SchemaMismatch {
            expected: REGISTRY_COLUMNS.len(),
            found: df.width(),
        });
    }
    df.set_column_names(REGISTRY_COLUMNS.iter().copied())
        .map_err(StationCatalogError::CsvRead)?;

    records_from_frame(&df).map_err(StationCatalogError::CsvRead)
}

fn records_from_frame(df: &DataFrame) -> PolarsResult<Vec<StationRecord>> {
    let text = |name: &str| -> PolarsResult<Vec<Option<String>>> {
        Ok(df
            .column(name)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from))
            .collect())
    };
    let number = |name: &str| -> PolarsResult<Vec<Option<f64>>> {
        Ok(df
            .column(name)?
            .str()?
            .into_iter()
            .map(parse_measurement)
            .collect())
    };

    let names = text("station")?;
    let ids = text("id")?;
    let wigos = text("wigos_id")?;
    let since = text("data_since")?;
    let elevation = number("station_elev_masl")?;
    let x = number("x")?;
    let y = number("y")?;
    let lat = number("latitude")?;
    let lon = number("longitude")?;
    let region = text("climate_region")?;
    let canton = text("canton")?;
    let historical = text("url_verified_data")?;
    let current = text("url_current_data")?;

    let mut stations = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let Some(name) = names[i].clone() else {
            debug!("Dropping registry row {} without a station name", i);
            continue;
        };
        let (Some(id), Some(historical_url), Some(current_url)) =
            (ids[i].clone(), historical[i].clone(), current[i].clone())
        else {
            debug!("Dropping registry row {} ({}) without id or data URLs", i, name);
            continue;
        };
        stations.push(StationRecord {
            id,
            name,
            wigos_id: wigos[i].clone(),
            registration_date: since[i].as_deref().and_then(parse_registry_date),
            elevation: elevation[i],
            x: x[i],
            y: y[i],
            latitude: lat[i],
            longitude: lon[i],
            climate_region: region[i].clone(),
            canton: canton[i].clone(),
            historical_source_url: historical_url,
            current_source_url: current_url,
        });
    }
    Ok(stations)
}

fn parse_registry_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}
