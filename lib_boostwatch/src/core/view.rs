//! # Timeline View Model
//!
//! What the session tells a renderer. The core never draws anything; it emits
//! [`ViewEffect`]s and a renderer implementing [`TimelineView`] applies them.

use chrono::{DateTime, Utc};

use super::apps::AppCatalog;
use super::session::FeedView;
use crate::feed::{ActionType, Anchor, BoostEvent, Placement};
use crate::numerology::{Annotation, NumerologyMatcher};

/// Link prefix for remote items that carry a feed guid.
const PODCASTINDEX_PODCAST_URL: &str = "https://podcastindex.org/podcast/";

/// Balance indicator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceDisplay {
    /// A valid reading.
    Sats {
        /// Balance in sats.
        amount: i64,
        /// Went up since the previous reading.
        increased: bool,
    },
    /// The server answered with something other than a number.
    Error(String),
}

/// Who to send a reply to, taken from the event's TLV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Lightning address or node.
    pub address: String,
    /// Original sender name.
    pub sender: String,
    /// Keysend custom key, if required.
    pub custom_key: Option<String>,
    /// Keysend custom value, if required.
    pub custom_value: Option<String>,
}

/// The item the listener was actually playing, for value-for-value splits
/// routed through another show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Remote podcast name.
    pub podcast: Option<String>,
    /// Remote episode name.
    pub episode: Option<String>,
    /// Podcast Index page for the remote feed.
    pub link: Option<String>,
}

/// # Timeline Row
///
/// Presentation data for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    /// Event index.
    pub index: u64,
    /// Unix seconds.
    pub timestamp: i64,
    /// Kind of payment.
    pub action: ActionType,
    /// Amount shown.
    pub sats: i64,
    /// Amount actually received.
    pub received_sats: i64,
    /// Received amount differs from the shown amount.
    pub amount_differs: bool,
    /// "from X" or "sent to X".
    pub person: String,
    /// App name as sent.
    pub app: String,
    /// Icon for the app.
    pub app_icon: String,
    /// App homepage.
    pub app_url: Option<String>,
    /// Podcast name.
    pub podcast: String,
    /// Episode name.
    pub episode: String,
    /// Remote item info, if any.
    pub remote: Option<RemoteItem>,
    /// Boostagram text.
    pub message: String,
    /// Numerology for the shown amount.
    pub numerology: Annotation,
    /// Reply destination, when the TLV carried one.
    pub reply_to: Option<ReplyTarget>,
    /// Already replied to.
    pub reply_sent: bool,
}

impl TimelineRow {
    /// Builds the row for `event` as seen in `view`.
    pub fn build(
        event: &BoostEvent,
        view: FeedView,
        numerology: &NumerologyMatcher,
        apps: &AppCatalog,
        show_received: bool,
    ) -> Self {
        let tlv = event.tlv_data();
        let received_sats = event.received_sats();
        let total_sats = event.display_sats();
        let sats = if show_received && received_sats > 0 {
            received_sats
        } else {
            total_sats
        };

        let person = match view {
            FeedView::Sent if tlv.name.is_some() => {
                format!("sent to {}", tlv.name.as_deref().unwrap_or_default())
            }
            _ if event.sender.is_empty() => String::new(),
            _ => format!("from {}", event.sender),
        };

        let badge = apps.lookup(&event.app);

        let remote = if event.remote_podcast.is_some() || event.remote_episode.is_some() {
            Some(RemoteItem {
                podcast: event.remote_podcast.clone(),
                episode: event.remote_episode.clone(),
                link: tlv
                    .remote_feed_guid
                    .as_deref()
                    .map(|guid| format!("{}{}", PODCASTINDEX_PODCAST_URL, guid)),
            })
        } else {
            None
        };

        let reply_to = tlv.reply_address.clone().map(|address| ReplyTarget {
            address,
            sender: event.sender.clone(),
            custom_key: tlv.reply_custom_key.clone(),
            custom_value: tlv.reply_custom_value.clone(),
        });

        Self {
            index: event.index,
            timestamp: event.timestamp,
            action: event.action,
            sats,
            received_sats,
            amount_differs: received_sats > 0 && total_sats > 0 && received_sats != total_sats,
            person,
            app: event.app.clone(),
            app_icon: badge.icon,
            app_url: badge.url,
            podcast: event.podcast.clone(),
            episode: event.episode.clone(),
            remote,
            message: event.message.clone(),
            numerology: numerology.annotate(total_sats.max(0) as u64),
            reply_to,
            reply_sent: event.reply_sent,
        }
    }

    /// Relative age label as of `now`.
    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        human_age(self.timestamp, now)
    }
}

/// "just now", "5 minutes ago", "1 hour ago", "3 days ago".
pub fn human_age(timestamp: i64, now: DateTime<Utc>) -> String {
    let Some(then) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return String::new();
    };
    let secs = (now - then).num_seconds();

    let (value, unit) = match secs {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s => (s / 86_400, "day"),
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{} {}{} ago", value, unit, plural)
}

/// # View Effect
///
/// One observable change produced by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    /// A new row next to `anchor`.
    Inserted {
        /// Row data.
        row: TimelineRow,
        /// Neighbor to attach to.
        anchor: Anchor,
        /// Front, back, or gap.
        placement: Placement,
        /// Ascending ordinal position.
        position: usize,
    },
    /// The list is at its newest end and new rows arrived there.
    ScrollToNewest,
    /// A gap-filling row arrived; a visual effect without sound.
    Celebrate {
        /// Row that filled the gap.
        index: u64,
    },
    /// Nothing to show yet.
    ShowEmptyIndicator {
        /// Index the session is waiting from.
        looking_for: u64,
    },
    /// Events arrived after the empty state.
    HideEmptyIndicator,
    /// Older history may exist below `cursor`.
    ShowLoadMore {
        /// Lowest known index.
        cursor: u64,
    },
    /// No older history is expected.
    HideLoadMore,
    /// The current-index endpoint returned something unusable.
    IndexUnavailable(String),
    /// New balance indicator state.
    Balance(BalanceDisplay),
    /// A reply was recorded against this row.
    ReplyMarked {
        /// Row index.
        index: u64,
    },
    /// A reply did not go through.
    ReplyFailed(String),
    /// Authorization was denied. The session has stopped.
    RedirectToLogin,
}

/// Consumer of session output.
pub trait TimelineView: Send {
    /// Applies one effect.
    fn apply(&mut self, effect: &ViewEffect);

    /// Re-renders relative timestamps.
    fn refresh_ages(&mut self, _now: DateTime<Utc>) {}
}
