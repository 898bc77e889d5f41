pub mod batch;
pub mod config;
pub mod pipeline;
pub mod types;
