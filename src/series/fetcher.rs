use crate::series::error::SeriesError;
use crate::series::frame::{observations_from_raw, read_semicolon_csv};
use crate::source::{decode_windows_1252, ByteSource};
use crate::types::data_source::{SourceKind, SERIES_COLUMNS};
use crate::types::observation::DailyObservation;
use crate::types::station::StationRecord;
use futures_util::stream::{self, StreamExt};
use log::{info, warn};
use std::sync::Arc;
use tokio::task;

/// Per-station outcome of a multi-station fetch, in input order.
#[derive(Debug)]
pub struct BatchFetch {
    kind: SourceKind,
    results: Vec<(String, Result<Vec<DailyObservation>, SeriesError>)>,
}

impl BatchFetch {
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn results(&self) -> &[(String, Result<Vec<DailyObservation>, SeriesError>)] {
        &self.results
    }

    pub fn failed_stations(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// All rows concatenated in station order, or `BatchFetchFailed` if any
    /// station failed. No partial result is returned.
    pub fn into_rows(self) -> Result<Vec<DailyObservation>, SeriesError> {
        let total = self.results.len();
        let mut rows = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in self.results {
            match result {
                Ok(station_rows) => rows.extend(station_rows),
                Err(e) => failed.push((id, e)),
            }
        }
        if failed.is_empty() {
            Ok(rows)
        } else {
            Err(SeriesError::BatchFetchFailed {
                kind: self.kind,
                total,
                failed,
            })
        }
    }

    /// Rows of the stations that succeeded, in station order, plus the
    /// failures for the caller to report.
    pub fn into_succeeded(self) -> (Vec<DailyObservation>, Vec<(String, SeriesError)>) {
        let mut rows = Vec::new();
        let mut failed = Vec::new();
        for (id, result) in self.results {
            match result {
                Ok(station_rows) => rows.extend(station_rows),
                Err(e) => {
                    warn!("Dropping station {} from {} batch: {}", id, self.kind, e);
                    failed.push((id, e));
                }
            }
        }
        (rows, failed)
    }
}

/// Downloads and normalizes per-station CSV files.
pub struct RawSeriesFetcher<S> {
    source: Arc<S>,
    max_concurrent: usize,
}

impl<S: ByteSource> RawSeriesFetcher<S> {
    pub fn new(source: Arc<S>, max_concurrent: usize) -> Self {
        Self {
            source,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetches one station's historical or current file.
    pub async fn fetch_station(
        &self,
        station: &StationRecord,
        kind: SourceKind,
    ) -> Result<Vec<DailyObservation>, SeriesError> {
        let url = station.source_url(kind);
        let bytes = self
            .source
            .fetch(url)
            .await
            .map_err(|e| SeriesError::SourceUnavailable {
                station: station.id.clone(),
                kind,
                source: e,
            })?;
        let rows = Self::parse_series(bytes, &station.id, kind).await?;
        info!(
            "Parsed {} {} rows for station {}",
            rows.len(),
            kind,
            station.id
        );
        Ok(rows)
    }

    /// Fetches every station. Up to `max_concurrent` downloads run at once;
    /// results keep the order of `stations`.
    pub async fn fetch_all(&self, stations: &[StationRecord], kind: SourceKind) -> BatchFetch {
        let results = stream::iter(stations)
            .map(|station| async move {
                (station.id.clone(), self.fetch_station(station, kind).await)
            })
            .buffered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;
        BatchFetch { kind, results }
    }

    /// Parses raw CSV bytes into observations using a blocking task.
    /// Columns are mapped by position, not by header name.
    async fn parse_series(
        bytes: Vec<u8>,
        station: &str,
        kind: SourceKind,
    ) -> Result<Vec<DailyObservation>, SeriesError> {
        let station_owned = station.to_string();

        task::spawn_blocking(move || {
            let text = decode_windows_1252(&bytes);
            let mut df = read_semicolon_csv(text).map_err(|e| SeriesError::CsvRead {
                station: station_owned.clone(),
                kind,
                source: e,
            })?;

            if df.width() != SERIES_COLUMNS.len() {
                warn!(
                    "CSV column count ({}) does not match schema length ({}) for station {} and type {}",
                    df.width(),
                    SERIES_COLUMNS.len(),
                    station_owned,
                    kind
                );
                return Err(SeriesError::SchemaMismatch {
                    station: station_owned,
                    kind,
                    expected: SERIES_COLUMNS.len(),
                    found: df.width(),
                });
            }

            df.set_column_names(SERIES_COLUMNS.iter().copied())
                .map_err(|e| SeriesError::CsvRead {
                    station: station_owned.clone(),
                    kind,
                    source: e,
                })?;

            observations_from_raw(&df).map_err(|e| SeriesError::CsvRead {
                station: station_owned,
                kind,
                source: e,
            })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_support::{series_csv, FakeSource};
    use crate::types::station::sample_station;
    use chrono::NaiveDate;

    fn fetcher(source: &Arc<FakeSource>) -> RawSeriesFetcher<FakeSource> {
        RawSeriesFetcher::new(Arc::clone(source), 2)
    }

    #[tokio::test]
    async fn test_fetch_station_parses_positional_columns() {
        let source = Arc::new(FakeSource::new());
        let bas = sample_station("BAS", 47.5, 7.6);
        source.insert(
            bas.source_url(SourceKind::Historical),
            series_csv("BAS", &[("19010101", "-1.2"), ("19010102", "-")]),
        );

        let rows = fetcher(&source)
            .fetch_station(&bas, SourceKind::Historical)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station_id, "BAS");
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(1901, 1, 1).unwrap());
        assert_eq!(rows[0].temp_avg, Some(-1.2));
        assert_eq!(rows[1].temp_avg, None);
        assert_eq!(source.calls(bas.source_url(SourceKind::Current)), 0);
    }

    #[tokio::test]
    async fn test_fetch_station_rejects_wrong_width() {
        let source = Arc::new(FakeSource::new());
        let bas = sample_station("BAS", 47.5, 7.6);
        source.insert(
            bas.source_url(SourceKind::Current),
            "station/location;date;tre200d0\nBAS;20240101;1.0\n",
        );

        let err = fetcher(&source)
            .fetch_station(&bas, SourceKind::Current)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::SchemaMismatch {
                expected: 12,
                found: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_station_unavailable() {
        let source = Arc::new(FakeSource::new());
        let bas = sample_station("BAS", 47.5, 7.6);
        let err = fetcher(&source)
            .fetch_station(&bas, SourceKind::Current)
            .await
            .unwrap_err();
        assert!(matches!(err, SeriesError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_station_order() {
        let source = Arc::new(FakeSource::new());
        let stations: Vec<_> = ["SMA", "BAS", "LUG"]
            .iter()
            .map(|id| sample_station(id, 46.0, 8.0))
            .collect();
        for s in &stations {
            source.insert(
                s.source_url(SourceKind::Current),
                series_csv(&s.id, &[("20240101", "1.0"), ("20240102", "2.0")]),
            );
        }

        let rows = fetcher(&source)
            .fetch_all(&stations, SourceKind::Current)
            .await
            .into_rows()
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r.station_id.as_str()).collect();
        assert_eq!(ids, ["SMA", "SMA", "BAS", "BAS", "LUG", "LUG"]);
    }

    #[tokio::test]
    async fn test_single_failure_aborts_strict_batch() {
        let source = Arc::new(FakeSource::new());
        let stations = vec![
            sample_station("SMA", 47.4, 8.6),
            sample_station("BAS", 47.5, 7.6),
        ];
        source.insert(
            stations[0].source_url(SourceKind::Current),
            series_csv("SMA", &[("20240101", "1.0")]),
        );

        let batch = fetcher(&source)
            .fetch_all(&stations, SourceKind::Current)
            .await;
        assert_eq!(batch.failed_stations(), ["BAS"]);

        match batch.into_rows() {
            Err(SeriesError::BatchFetchFailed { total, failed, .. }) => {
                assert_eq!(total, 2);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, "BAS");
            }
            other => panic!("expected BatchFetchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_batch_keeps_succeeded_stations() {
        let source = Arc::new(FakeSource::new());
        let stations = vec![
            sample_station("SMA", 47.4, 8.6),
            sample_station("BAS", 47.5, 7.6),
        ];
        source.insert(
            stations[1].source_url(SourceKind::Current),
            series_csv("BAS", &[("20240101", "3.0")]),
        );

        let (rows, failed) = fetcher(&source)
            .fetch_all(&stations, SourceKind::Current)
            .await
            .into_succeeded();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].station_id, "BAS");
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "SMA");
    }
}
