pub mod engine;
pub mod normal;
