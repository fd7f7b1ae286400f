//! Merges the historical and current portions of the station records.
//!
//! The historical files are large and frozen, so they are downloaded once and
//! persisted as a parquet snapshot. Current files change daily and are fetched
//! on every load.

use crate::derived::engine::DerivedColumnEngine;
use crate::series::enriched::EnrichedSeries;
use crate::series::error::SeriesError;
use crate::series::fetcher::{BatchFetch, RawSeriesFetcher};
use crate::series::frame::{observations_from_frame, observations_to_frame};
use crate::source::ByteSource;
use crate::types::data_source::SourceKind;
use crate::types::observation::DailyObservation;
use crate::types::station::StationRecord;
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::{fs, task};

/// Whether a historical snapshot exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No snapshot; the next load downloads the historical files.
    ColdCache,
    /// A snapshot exists; historical data is read from disk.
    WarmCache,
}

/// What to do when some stations of a batch fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Any failed station fails the whole load.
    #[default]
    AbortOnFailure,
    /// Continue with the stations that succeeded and log the rest.
    KeepSucceeded,
}

pub struct MergeCache<S> {
    fetcher: RawSeriesFetcher<S>,
    engine: DerivedColumnEngine,
    snapshot_path: PathBuf,
    batch_policy: BatchPolicy,
    fallback_on_cache_error: bool,
    // Serializes snapshot writes and deletions within the process.
    write_lock: Mutex<()>,
}

impl<S: ByteSource> MergeCache<S> {
    pub fn new(
        fetcher: RawSeriesFetcher<S>,
        engine: DerivedColumnEngine,
        snapshot_path: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            engine,
            snapshot_path,
            batch_policy: BatchPolicy::default(),
            fallback_on_cache_error: true,
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    /// With the fallback disabled, snapshot read/write errors fail the load.
    pub fn with_cache_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_cache_error = enabled;
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub async fn state(&self) -> CacheState {
        let is_file = fs::metadata(&self.snapshot_path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file {
            CacheState::WarmCache
        } else {
            CacheState::ColdCache
        }
    }

    /// Historical rows followed by current rows, enriched.
    ///
    /// Rows of a `(station, date)` covered by both portions are all kept.
    pub async fn load(&self, stations: &[StationRecord]) -> Result<EnrichedSeries, SeriesError> {
        let historical = self.historical(stations).await?;
        let (current, _complete) = self.collect_batch(
            self.fetcher.fetch_all(stations, SourceKind::Current).await,
        )?;
        info!(
            "Merging {} historical and {} current rows",
            historical.len(),
            current.len()
        );

        let mut rows = historical;
        rows.extend(current);
        Ok(EnrichedSeries::new(self.engine.enrich(&rows)))
    }

    /// Deletes the snapshot so the next load refetches the historical files.
    pub async fn invalidate(&self) -> Result<(), SeriesError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.snapshot_path).await {
            Ok(()) => {
                info!("Deleted cache snapshot {:?}", self.snapshot_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SeriesError::CacheDeletion(self.snapshot_path.clone(), e)),
        }
    }

    async fn historical(
        &self,
        stations: &[StationRecord],
    ) -> Result<Vec<DailyObservation>, SeriesError> {
        let _guard = self.write_lock.lock().await;

        if self.state().await == CacheState::WarmCache {
            info!("Cache hit for historical data at {:?}", self.snapshot_path);
            match Self::read_snapshot(&self.snapshot_path).await {
                Ok(rows) => return Ok(rows),
                Err(e) if self.fallback_on_cache_error => {
                    warn!(
                        "Unreadable snapshot {:?}, refetching historical data: {}",
                        self.snapshot_path, e
                    );
                }
                Err(e) => return Err(e),
            }
        } else {
            warn!("Cache miss for historical data. Downloading and processing.");
        }

        let (rows, complete) = self.collect_batch(
            self.fetcher
                .fetch_all(stations, SourceKind::Historical)
                .await,
        )?;

        // A partial history must not become the snapshot, or the missing
        // stations would never be fetched again.
        if !complete {
            warn!("Historical batch incomplete, not writing the snapshot");
            return Ok(rows);
        }

        match Self::write_snapshot(&rows, &self.snapshot_path).await {
            Ok(()) => info!(
                "Cached {} historical rows to {:?}",
                rows.len(),
                self.snapshot_path
            ),
            Err(e) if self.fallback_on_cache_error => {
                warn!("Could not persist snapshot, continuing without it: {}", e)
            }
            Err(e) => return Err(e),
        }
        Ok(rows)
    }

    /// Rows of the batch under the configured policy, and whether every
    /// station succeeded.
    fn collect_batch(
        &self,
        batch: BatchFetch,
    ) -> Result<(Vec<DailyObservation>, bool), SeriesError> {
        match self.batch_policy {
            BatchPolicy::AbortOnFailure => Ok((batch.into_rows()?, true)),
            BatchPolicy::KeepSucceeded => {
                let (rows, failed) = batch.into_succeeded();
                if !failed.is_empty() {
                    let ids: Vec<_> = failed.iter().map(|(id, _)| id.as_str()).collect();
                    warn!("Continuing without stations {:?}", ids);
                }
                Ok((rows, failed.is_empty()))
            }
        }
    }

    async fn read_snapshot(path: &Path) -> Result<Vec<DailyObservation>, SeriesError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&path_buf, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| SeriesError::CacheRead(path_buf.clone(), e))?;
            observations_from_frame(&df).map_err(|e| SeriesError::CacheCorrupt {
                path: path_buf,
                message: e.to_string(),
            })
        })
        .await?
    }

    /// Writes the snapshot to a temporary file next to `path` and renames it
    /// into place, so readers never see a partial file.
    async fn write_snapshot(rows: &[DailyObservation], path: &Path) -> Result<(), SeriesError> {
        let mut df = observations_to_frame(rows)?;
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let dir = path_buf
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)
                .map_err(|e| SeriesError::CacheDirCreation(dir.clone(), e))?;
            let mut tmp = NamedTempFile::new_in(&dir)
                .map_err(|e| SeriesError::CacheWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(tmp.as_file_mut())
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| SeriesError::CacheWritePolars(path_buf.clone(), e))?;
            tmp.persist(&path_buf)
                .map_err(|e| SeriesError::CacheWriteIo(path_buf.clone(), e.error))?;
            Ok::<(), SeriesError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::{series_csv, FakeSource};
    use crate::types::station::sample_station;
    use chrono::NaiveDate;
    use std::sync::Arc;

    struct Fixture {
        source: Arc<FakeSource>,
        stations: Vec<StationRecord>,
        _dir: tempfile::TempDir,
        cache: MergeCache<FakeSource>,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(FakeSource::new());
        let stations = vec![
            sample_station("BAS", 47.54, 7.58),
            sample_station("SMA", 47.38, 8.57),
        ];
        for s in &stations {
            source.insert(
                s.source_url(SourceKind::Historical),
                series_csv(&s.id, &[("18990115", "-2.0"), ("19990701", "19.3")]),
            );
            source.insert(
                s.source_url(SourceKind::Current),
                series_csv(&s.id, &[("20240301", "8.0")]),
            );
        }
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_at(&source, dir.path().join("nbcn-historical.parquet"));
        Fixture {
            source,
            stations,
            _dir: dir,
            cache,
        }
    }

    fn cache_at(source: &Arc<FakeSource>, path: PathBuf) -> MergeCache<FakeSource> {
        MergeCache::new(
            RawSeriesFetcher::new(Arc::clone(source), 2),
            DerivedColumnEngine::default(),
            path,
        )
    }

    #[tokio::test]
    async fn test_cold_load_fetches_history_once_and_warms() {
        let f = fixture();
        assert_eq!(f.cache.state().await, CacheState::ColdCache);

        let series = f.cache.load(&f.stations).await.unwrap();

        assert_eq!(f.cache.state().await, CacheState::WarmCache);
        assert_eq!(f.source.calls_matching("_previous"), 2);
        assert_eq!(f.source.calls_matching("_current"), 2);
        assert_eq!(series.len(), 6);

        let snapshot = MergeCache::<FakeSource>::read_snapshot(f.cache.snapshot_path())
            .await
            .unwrap();
        let historical: Vec<_> = series
            .rows()
            .iter()
            .filter(|r| r.year < 2024)
            .map(|r| (r.station_id.clone(), r.date, r.temp_avg))
            .collect();
        let reloaded: Vec<_> = snapshot
            .iter()
            .map(|r| (r.station_id.clone(), r.date, r.temp_avg))
            .collect();
        assert_eq!(historical, reloaded);
    }

    #[tokio::test]
    async fn test_warm_loads_skip_historical_source() {
        let f = fixture();
        let first = f.cache.load(&f.stations).await.unwrap();
        let history_calls = f.source.calls_matching("_previous");

        let second = f.cache.load(&f.stations).await.unwrap();
        let third = f.cache.load(&f.stations).await.unwrap();

        assert_eq!(f.source.calls_matching("_previous"), history_calls);
        assert_eq!(f.source.calls_matching("_current"), 6);
        assert_eq!(first.rows(), second.rows());
        assert_eq!(second.rows(), third.rows());
    }

    #[tokio::test]
    async fn test_warm_load_survives_origin_outage_for_history() {
        let f = fixture();
        f.cache.load(&f.stations).await.unwrap();
        for s in &f.stations {
            f.source.remove(s.source_url(SourceKind::Historical));
        }
        let series = f.cache.load(&f.stations).await.unwrap();
        assert_eq!(series.len(), 6);
    }

    #[tokio::test]
    async fn test_historical_rows_come_first() {
        let f = fixture();
        let series = f.cache.load(&f.stations).await.unwrap();
        let ids_and_years: Vec<_> = series
            .rows()
            .iter()
            .map(|r| (r.station_id.as_str(), r.year))
            .collect();
        assert_eq!(
            ids_and_years,
            [
                ("BAS", 1899),
                ("BAS", 1999),
                ("SMA", 1899),
                ("SMA", 1999),
                ("BAS", 2024),
                ("SMA", 2024)
            ]
        );
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let f = fixture();
        f.cache.load(&f.stations).await.unwrap();
        f.cache.invalidate().await.unwrap();
        assert_eq!(f.cache.state().await, CacheState::ColdCache);

        f.cache.load(&f.stations).await.unwrap();
        assert_eq!(f.source.calls_matching("_previous"), 4);
        assert_eq!(f.cache.state().await, CacheState::WarmCache);

        // deleting a missing snapshot is not an error
        f.cache.invalidate().await.unwrap();
        f.cache.invalidate().await.unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_dates_are_not_deduplicated() {
        let f = fixture();
        let bas = &f.stations[0];
        f.source.insert(
            bas.source_url(SourceKind::Current),
            series_csv("BAS", &[("19990701", "25.0")]),
        );

        let series = f.cache.load(&f.stations).await.unwrap();
        let overlap = NaiveDate::from_ymd_opt(1999, 7, 1).unwrap();
        let mut values: Vec<_> = series
            .rows()
            .iter()
            .filter(|r| r.station_id == "BAS" && r.date == overlap)
            .map(|r| r.temp_avg)
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, vec![Some(19.3), Some(25.0)]);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_origin() {
        let f = fixture();
        std::fs::write(f.cache.snapshot_path(), b"not parquet").unwrap();
        assert_eq!(f.cache.state().await, CacheState::WarmCache);

        let series = f.cache.load(&f.stations).await.unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(f.source.calls_matching("_previous"), 2);
        // the refetched history replaced the corrupt file
        assert!(MergeCache::<FakeSource>::read_snapshot(f.cache.snapshot_path())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_fatal_without_fallback() {
        let f = fixture();
        let cache = f.cache.with_cache_fallback(false);
        std::fs::write(cache.snapshot_path(), b"not parquet").unwrap();

        let err = cache.load(&f.stations).await.unwrap_err();
        assert!(matches!(err, SeriesError::CacheRead(..)));
        assert_eq!(f.source.calls_matching("_previous"), 0);
    }

    #[tokio::test]
    async fn test_failed_history_leaves_cache_cold() {
        let f = fixture();
        f.source
            .remove(f.stations[1].source_url(SourceKind::Historical));

        let err = f.cache.load(&f.stations).await.unwrap_err();
        assert!(matches!(err, SeriesError::BatchFetchFailed { .. }));
        assert_eq!(f.cache.state().await, CacheState::ColdCache);
    }

    #[tokio::test]
    async fn test_keep_succeeded_policy_loads_partial_batch() {
        let f = fixture();
        f.source.remove(f.stations[1].source_url(SourceKind::Current));
        let cache = f.cache.with_batch_policy(BatchPolicy::KeepSucceeded);

        let series = cache.load(&f.stations).await.unwrap();
        assert_eq!(series.len(), 5);
    }

    #[tokio::test]
    async fn test_partial_history_is_not_snapshotted() {
        let f = fixture();
        let sma_history = f.stations[1].source_url(SourceKind::Historical).to_string();
        let body = series_csv("SMA", &[("18990115", "-2.0"), ("19990701", "19.3")]);
        f.source.remove(&sma_history);
        let cache = f.cache.with_batch_policy(BatchPolicy::KeepSucceeded);

        let partial = cache.load(&f.stations).await.unwrap();
        assert_eq!(partial.len(), 4);
        assert_eq!(cache.state().await, CacheState::ColdCache);

        f.source.insert(&sma_history, body);
        let full = cache.load(&f.stations).await.unwrap();
        let sma_history_rows = full
            .rows()
            .iter()
            .filter(|r| r.station_id == "SMA" && r.year < 2024)
            .count();
        assert_eq!(sma_history_rows, 2);
        assert_eq!(cache.state().await, CacheState::WarmCache);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_keeps_rows_in_memory() {
        let f = fixture();
        let blocker = f._dir.path().join("blocker");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let cache = cache_at(&f.source, blocker.join("nbcn-historical.parquet"));

        let series = cache.load(&f.stations).await.unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(cache.state().await, CacheState::ColdCache);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_is_fatal_without_fallback() {
        let f = fixture();
        let blocker = f._dir.path().join("blocker");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let cache =
            cache_at(&f.source, blocker.join("nbcn-historical.parquet")).with_cache_fallback(false);

        let err = cache.load(&f.stations).await.unwrap_err();
        assert!(matches!(
            err,
            SeriesError::CacheDirCreation(..) | SeriesError::CacheWriteIo(..)
        ));
    }

    #[tokio::test]
    async fn test_directory_at_snapshot_path_is_cold() {
        let f = fixture();
        std::fs::create_dir(f.cache.snapshot_path()).unwrap();
        assert_eq!(f.cache.state().await, CacheState::ColdCache);
    }
}
