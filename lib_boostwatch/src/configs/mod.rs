//! # Configuration Modules
//!
//! Layered configuration for the watcher: built-in defaults, then a JSON
//! file, then environment variables and command-line flags.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Watcher configuration and its resolution into concrete settings.
pub mod config_watch;

pub use config_watch::{ConfigError, Settings, WatchConfig, load_config, load_config_from};
