//! cos-client - Object storage client with signed requests and typed XML envelopes

pub mod config;
pub mod cos;

pub use config::Config;
pub use cos::{CosClient, CosConfig, CosError};
