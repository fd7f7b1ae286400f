//! Settings of the data pipeline.

use crate::derived::engine::DegreeDayThresholds;
use crate::derived::normal::START_INDUSTRIAL_PERIOD;
use crate::series::merge_cache::BatchPolicy;
use crate::stations::catalog::DEFAULT_REGISTRY_URL;
use bon::Builder;
use std::path::PathBuf;

pub const DEFAULT_SNAPSHOT_FILE_NAME: &str = "nbcn-historical.parquet";
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Configuration of an [`crate::Nbcn`] client.
///
/// # Examples
///
/// ```
/// use nbcn_climate::{BatchPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .cache_dir("/tmp/nbcn".into())
///     .max_concurrent_fetches(8)
///     .batch_policy(BatchPolicy::KeepSucceeded)
///     .build();
/// assert_eq!(config.snapshot_file_name, "nbcn-historical.parquet");
/// assert_eq!(config.reference_year, 1900);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PipelineConfig {
    /// Directory holding the historical snapshot. Created if missing.
    pub cache_dir: PathBuf,
    #[builder(default = DEFAULT_REGISTRY_URL.to_string(), into)]
    pub registry_url: String,
    #[builder(default = DEFAULT_SNAPSHOT_FILE_NAME.to_string(), into)]
    pub snapshot_file_name: String,
    /// Upper bound on simultaneous station downloads.
    #[builder(default = DEFAULT_MAX_CONCURRENT_FETCHES)]
    pub max_concurrent_fetches: usize,
    #[builder(default)]
    pub batch_policy: BatchPolicy,
    /// Recover from an unreadable or unwritable snapshot by refetching
    /// (read) or continuing in memory (write) instead of failing.
    #[builder(default = true)]
    pub fallback_on_cache_error: bool,
    #[builder(default)]
    pub thresholds: DegreeDayThresholds,
    /// Samples before this year form the climate normal.
    #[builder(default = START_INDUSTRIAL_PERIOD)]
    pub reference_year: i32,
}

impl PipelineConfig {
    /// Defaults for everything, caching in `cache_dir`.
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self::builder().cache_dir(cache_dir).build()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.cache_dir.join(&self.snapshot_file_name)
    }
}
