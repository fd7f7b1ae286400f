pub mod data_source;
pub mod observation;
pub mod resolution;
pub mod station;
