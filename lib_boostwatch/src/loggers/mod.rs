//! # Loggers
//!
//! Process-wide `tracing` subscriber setup.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Console and rolling JSON file logging.
pub mod tracing_setup;

pub use tracing_setup::{LogOptions, setup_logging};
