//! # lib_boostwatch
//!
//! Client library for boost/stream payment feeds: polls the feed server,
//! reconciles pages into an ordered, deduplicated timeline, annotates amounts
//! and plays notification cues without overlap.
//!
//! Every module lives in its own folder behind a cargo feature of the same
//! name; `full` enables all of them except `audio`.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

// Declare the modules, each behind its feature.
#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "feed")]
pub mod feed;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "numerology")]
pub mod numerology;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "triggers")]
pub mod triggers;
#[cfg(feature = "triggers")]
pub mod utils;
