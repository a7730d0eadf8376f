pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::MediaConfig};
pub use core::{engine::PrepEngine, pipeline::MediaPipeline};
pub use utils::error::{PrepError, Result};
