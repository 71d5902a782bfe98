//! Parsing and validation of `kiln.toml` cache configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`KilnConfig`] with per-target resolution of data roots, output
//! directories, and dependent targets.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_target, ResolvedTarget};
pub use types::*;
