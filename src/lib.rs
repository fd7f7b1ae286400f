mod config;
mod derived;
mod error;
mod filtering;
mod frames;
mod nbcn;
mod series;
mod source;
mod stations;
mod types;
mod utils;

pub use config::*;
pub use error::NbcnError;
pub use nbcn::*;

pub use derived::engine::*;
pub use derived::normal::*;
pub use filtering::ClimateFrameExt;
pub use frames::station_view::*;

pub use series::enriched::EnrichedSeries;
pub use series::fetcher::{BatchFetch, RawSeriesFetcher};
pub use series::merge_cache::{BatchPolicy, CacheState, MergeCache};
pub use source::{ByteSource, HttpSource, SourceError};
pub use stations::catalog::{StationCatalog, DEFAULT_REGISTRY_URL};
pub use stations::locate_station::StationLocator;

pub use types::data_source::SourceKind;
pub use types::observation::*;
pub use types::resolution::Resolution;
pub use types::station::StationRecord;

pub use series::error::SeriesError;
pub use stations::error::StationCatalogError;
