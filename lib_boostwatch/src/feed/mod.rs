//! # Feed
//!
//! The event model and the ordered store that reconciled poll results land in.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Boost event wire model and TLV extraction.
pub mod event;
/// Ordered, deduplicated event storage.
pub mod store;

pub use event::{ActionClass, ActionType, BoostEvent, EventEffect, TlvData};
pub use store::{Anchor, FeedStore, Insertion, Placement};
