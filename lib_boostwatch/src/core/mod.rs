//! # Core Session Engine
//!
//! The part of the client that turns raw feed pages into a timeline.
//!
//! ## Core Components:
//!
//! - **`session`**: the explicit [`SessionContext`]: view, settings, store,
//!   cursors and indicator flags. No process-wide state.
//!
//! - **`reconciler`**: plans fetches, filters and merges pages, and derives
//!   view effects and playback triggers from what was inserted.
//!
//! - **`balance`**: turns balance readings into indicator changes.
//!
//! - **`apps`**: normalized app name lookup for icons and homepages.
//!
//! - **`view`**: the [`ViewEffect`] vocabulary, row presentation data and the
//!   [`TimelineView`] trait renderers implement.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// App icon catalog.
pub mod apps;
/// Balance indicator tracking.
pub mod balance;
/// Poll planning, merging and effect derivation.
pub mod reconciler;
/// Per-session state.
pub mod session;
/// View effects and row presentation.
pub mod view;

// --- Public API Re-exports ---
pub use apps::{AppBadge, AppCatalog, GENERIC_ICON};
pub use balance::BalanceTracker;
pub use reconciler::{Applied, PollMode, PollOutcome, Reconciler, apply_page, plan, plan_cold_start, triggers_for};
pub use session::{Direction, FeedView, PageRequest, SessionContext, SessionSettings};
pub use view::{BalanceDisplay, ReplyTarget, TimelineRow, TimelineView, ViewEffect, human_age};
