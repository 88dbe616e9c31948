//! # Utilities
//!
//! Small runtime helpers shared by the feature modules.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Cancellable periodic task spawning.
pub mod periodic;
