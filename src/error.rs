use crate::derived::normal::ClimateNormalError;
use crate::series::error::SeriesError;
use crate::stations::error::StationCatalogError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbcnError {
    #[error(transparent)]
    StationCatalog(#[from] StationCatalogError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    ClimateNormal(#[from] ClimateNormalError),

    #[error("Station '{0}' is not in the registry")]
    StationNotFound(String),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
