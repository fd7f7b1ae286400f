use crate::source::SourceError;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StationCatalogError {
    #[error("Could not retrieve the station registry from {url}")]
    SourceUnavailable {
        url: String,
        #[source]
        source: SourceError,
    },

    #[error("Failed to parse the station registry CSV")]
    CsvRead(#[source] PolarsError),

    #[error("Station registry has {found} columns, expected {expected}")]
    SchemaMismatch { expected: usize, found: usize },

    // Covers errors joining tokio blocking tasks
    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
