//! # Data Ingestors Module
//!
//! The two ways events enter a session:
//!
//! - **`feed_polling`**: timer-driven feed, balance and age-refresh tasks
//!   around a [`Reconciler`](crate::core::Reconciler), plus the update
//!   channel the renderer reads from.
//! - **`feed_wss`**: the optional WebSocket push channel with fixed-delay
//!   reconnects.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Periodic polling tasks and renderer plumbing.
pub mod feed_polling;
/// WebSocket push channel.
pub mod feed_wss;

// --- Public API Re-exports ---
pub use feed_polling::{FeedPoller, TimelineUpdate, drive_view, forward_outcome};
pub use feed_wss::{FeedPushIngestor, PushEvent, derive_ws_url};
