use crate::source::SourceError;
use crate::types::data_source::SourceKind;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Could not retrieve {kind} data for station '{station}'")]
    SourceUnavailable {
        station: String,
        kind: SourceKind,
        #[source]
        source: SourceError,
    },

    // Errors during CSV reading (inside blocking task)
    #[error("Parsing error processing {kind} CSV data for station '{station}'")]
    CsvRead {
        station: String,
        kind: SourceKind,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match schema length ({expected}) for {kind} data for station {station}")]
    SchemaMismatch {
        station: String,
        kind: SourceKind,
        expected: usize,
        found: usize,
    },

    #[error("Fetching {kind} data failed for {} of {total} stations: {}", .failed.len(), failed_ids(.failed))]
    BatchFetchFailed {
        kind: SourceKind,
        total: usize,
        failed: Vec<(String, SeriesError)>,
    },

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read cache snapshot '{0}'")]
    CacheRead(PathBuf, #[source] PolarsError),

    #[error("Corrupt cache snapshot '{path}': {message}")]
    CacheCorrupt { path: PathBuf, message: String },

    // Errors during parquet writing (inside blocking task)
    #[error("I/O error writing cache snapshot '{0}'")]
    CacheWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing cache snapshot '{0}'")]
    CacheWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to delete cache snapshot '{0}'")]
    CacheDeletion(PathBuf, #[source] std::io::Error),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

fn failed_ids(failed: &[(String, SeriesError)]) -> String {
    failed
        .iter()
        .map(|(id, _)| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
