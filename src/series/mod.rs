pub mod enriched;
pub mod error;
pub mod fetcher;
pub(crate) mod frame;
pub mod merge_cache;
