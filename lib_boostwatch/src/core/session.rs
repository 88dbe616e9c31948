//! # Session Context
//!
//! Everything one timeline session knows: which view it shows, the user's
//! settings, the store, the loaded configuration collaborators and the cursor
//! and indicator flags. The reconciler owns it; nothing else mutates it.

use std::fmt;
use std::str::FromStr;

use super::apps::AppCatalog;
use crate::feed::{ActionClass, ActionType, FeedStore};
use crate::numerology::NumerologyMatcher;
use crate::retrieve::PageQuery;

/// Events asked for per forward poll.
pub const FORWARD_PAGE_SIZE: u32 = 20;
/// Events asked for per backfill.
pub const BACKFILL_PAGE_SIZE: u32 = 100;
/// Sound played for events that bring no cue of their own.
pub const DEFAULT_SOUND: &str = "/pew.mp3";

/// # Feed View
///
/// Which feed the session follows. Each view fixes its endpoints and the
/// action class it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeedView {
    /// Received boosts.
    #[default]
    Boosts,
    /// Received streaming sats.
    Streams,
    /// Outgoing payments.
    Sent,
}

impl FeedView {
    /// Feed endpoint, relative to the server base.
    pub fn feed_path(self) -> &'static str {
        match self {
            FeedView::Boosts => "api/v1/boosts",
            FeedView::Streams => "api/v1/streams",
            FeedView::Sent => "api/v1/sent",
        }
    }

    /// Current-index endpoint, relative to the server base.
    pub fn index_path(self) -> &'static str {
        match self {
            FeedView::Boosts | FeedView::Streams => "api/v1/index",
            FeedView::Sent => "api/v1/sent_index",
        }
    }

    /// Whether events of `action` belong in this view.
    pub fn accepts(self, action: ActionType) -> bool {
        match self {
            FeedView::Boosts | FeedView::Sent => action.class() == ActionClass::Boost,
            FeedView::Streams => action.class() == ActionClass::Stream,
        }
    }

    /// Whether arrivals in this view play cues and celebrate. Payments the
    /// user sent themselves do neither.
    pub fn effects(self) -> bool {
        !matches!(self, FeedView::Sent)
    }
}

impl fmt::Display for FeedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedView::Boosts => "boosts",
            FeedView::Streams => "streams",
            FeedView::Sent => "sent",
        };
        f.write_str(name)
    }
}

impl FromStr for FeedView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boosts" | "boost" => Ok(FeedView::Boosts),
            "streams" | "stream" => Ok(FeedView::Streams),
            "sent" => Ok(FeedView::Sent),
            other => Err(format!("unknown view '{}', expected boosts, streams or sent", other)),
        }
    }
}

/// User-facing session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Events below this many sats are dropped.
    pub min_sats: i64,
    /// Whether new events make any sound.
    pub playback: bool,
    /// Show the received amount instead of the total.
    pub show_received_sats: bool,
    /// Fallback sound. `None` disables it.
    pub default_sound: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            min_sats: 0,
            playback: true,
            show_received_sats: false,
            default_sound: Some(DEFAULT_SOUND.to_string()),
        }
    }
}

/// Direction of a page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Newer than the cursor.
    Forward,
    /// Older than the cursor.
    Backfill,
}

/// A planned fetch. Built from the session under lock, executed without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Fetch direction.
    pub direction: Direction,
    /// Query sent to the feed endpoint.
    pub query: PageQuery,
    /// Newest-end insertions may play.
    pub play: bool,
    /// The cursor came from real data rather than a default.
    pub cursor_known: bool,
}

/// # Session Context
///
/// Owned by the reconciler behind a single lock.
#[derive(Debug, Default)]
pub struct SessionContext {
    /// Current view.
    pub view: FeedView,
    /// User settings.
    pub settings: SessionSettings,
    /// Reconciled events.
    pub store: FeedStore,
    /// Amount annotation rules.
    pub numerology: NumerologyMatcher,
    /// App icon lookup.
    pub apps: AppCatalog,
    /// Last index reported by the server's index endpoint.
    pub current_index: Option<u64>,
    /// The empty indicator is showing.
    pub showing_empty: bool,
    /// Cold start found nothing yet; the first arrivals must play.
    pub awaiting_first_events: bool,
    /// The renderer is scrolled to the newest end.
    pub at_newest: bool,
    /// Cursor of the load-more control, when shown.
    pub load_more_cursor: Option<u64>,
    /// Cleared once the server answered 403.
    pub authorized: bool,
}

impl SessionContext {
    /// Fresh session for `view`.
    pub fn new(
        view: FeedView,
        settings: SessionSettings,
        numerology: NumerologyMatcher,
        apps: AppCatalog,
    ) -> Self {
        Self {
            view,
            settings,
            numerology,
            apps,
            at_newest: true,
            authorized: true,
            ..Default::default()
        }
    }

    /// Switches to `view` and forgets everything that belongs to the old one.
    /// Settings and configuration are kept.
    pub fn reset(&mut self, view: FeedView) {
        self.view = view;
        self.store.clear();
        self.current_index = None;
        self.showing_empty = false;
        self.awaiting_first_events = false;
        self.at_newest = true;
        self.load_more_cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_filter_by_action_class() {
        assert!(FeedView::Boosts.accepts(ActionType::Boost));
        assert!(FeedView::Boosts.accepts(ActionType::Auto));
        assert!(FeedView::Boosts.accepts(ActionType::Invoice));
        assert!(!FeedView::Boosts.accepts(ActionType::Stream));
        assert!(FeedView::Streams.accepts(ActionType::Stream));
        assert!(FeedView::Streams.accepts(ActionType::Unknown));
        assert!(!FeedView::Streams.accepts(ActionType::Boost));
        assert!(FeedView::Sent.accepts(ActionType::Boost));
    }

    #[test]
    fn view_names_round_trip_through_from_str() {
        for view in [FeedView::Boosts, FeedView::Streams, FeedView::Sent] {
            assert_eq!(view.to_string().parse::<FeedView>(), Ok(view));
        }
        assert!("podcasts".parse::<FeedView>().is_err());
        assert_eq!(FeedView::Sent.index_path(), "api/v1/sent_index");
    }

    #[test]
    fn reset_keeps_settings() {
        let settings = SessionSettings {
            min_sats: 100,
            ..Default::default()
        };
        let mut ctx = SessionContext::new(
            FeedView::Boosts,
            settings.clone(),
            NumerologyMatcher::default(),
            AppCatalog::default(),
        );
        ctx.store.insert(Default::default());
        ctx.showing_empty = true;
        ctx.at_newest = false;
        ctx.reset(FeedView::Streams);
        assert!(ctx.store.is_empty());
        assert!(!ctx.showing_empty);
        assert!(ctx.at_newest);
        assert_eq!(ctx.view, FeedView::Streams);
        assert_eq!(ctx.settings, settings);
    }
}
