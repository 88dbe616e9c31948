//! # Boost Event Model
//!
//! Wire representation of a single payment event as delivered by the feed
//! endpoints and the push channel.
//!
//! ## Key Design Principles:
//! - **Index Identity**: `index` is the only identity and ordering key. Two
//!   records with the same index are the same event, whatever else differs.
//! - **Lenient Decoding**: every field except `index` has a default, so a
//!   partially populated record still decodes. Unknown action codes decode as
//!   [`ActionType::Unknown`] instead of failing the whole page.
//! - **Degrading TLV**: the raw TLV blob is kept as a string and parsed on
//!   demand. A malformed blob yields an empty [`TlvData`], never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # Action Type
///
/// Kind of payment, encoded on the wire as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ActionType {
    /// Code 0, or any code this client does not know.
    #[default]
    Unknown,
    /// Code 1, streamed sats sent while listening.
    Stream,
    /// Code 2, a one-off boost usually carrying a message.
    Boost,
    /// Code 3, a record the server flagged as invalid.
    Invalid,
    /// Code 4, a boost sent automatically by the listener's app.
    Auto,
    /// Code 5, a paid invoice.
    Invoice,
}

/// # Action Class
///
/// The two families a view can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionClass {
    /// Boosts, auto-boosts and invoices.
    Boost,
    /// Streams and everything unclassified.
    Stream,
}

impl ActionType {
    /// Numeric wire code.
    pub fn code(self) -> u8 {
        match self {
            ActionType::Unknown => 0,
            ActionType::Stream => 1,
            ActionType::Boost => 2,
            ActionType::Invalid => 3,
            ActionType::Auto => 4,
            ActionType::Invoice => 5,
        }
    }

    /// The family this action belongs to.
    pub fn class(self) -> ActionClass {
        match self {
            ActionType::Boost | ActionType::Auto | ActionType::Invoice => ActionClass::Boost,
            _ => ActionClass::Stream,
        }
    }
}

impl From<u8> for ActionType {
    fn from(code: u8) -> Self {
        match code {
            1 => ActionType::Stream,
            2 => ActionType::Boost,
            3 => ActionType::Invalid,
            4 => ActionType::Auto,
            5 => ActionType::Invoice,
            _ => ActionType::Unknown,
        }
    }
}

impl From<ActionType> for u8 {
    fn from(action: ActionType) -> Self {
        action.code()
    }
}

/// Settlement details attached by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentInfo {
    /// Lightning payment hash.
    pub payment_hash: String,
    /// Counterpart node public key.
    pub pubkey: String,
    /// Keysend custom record key, if any.
    pub custom_key: Option<u64>,
    /// Keysend custom record value, if any.
    pub custom_value: Option<String>,
    /// Routing fee paid, in msat.
    pub fee_msat: i64,
    /// For outgoing replies: index of the event being replied to.
    pub reply_to_idx: Option<u64>,
}

/// MIDI parameters the server attached to an event. Missing values take the
/// player defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiEffect {
    /// Note number.
    pub note: Option<u8>,
    /// Note-on velocity.
    pub velocity: Option<u8>,
    /// One-based MIDI channel.
    pub channel: Option<u8>,
    /// Note length in milliseconds.
    pub duration: Option<u64>,
}

/// Sound file the server attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundEffect {
    /// Path or URL of the sound file.
    pub sound_file: String,
    /// Display name.
    pub sound_name: String,
}

/// One server-prepared playback request. Each entry becomes one trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventEffect {
    /// Optional MIDI note.
    pub midi: Option<MidiEffect>,
    /// Optional sound file.
    pub sound: Option<SoundEffect>,
}

/// # Boost Event
///
/// One payment or streaming event. Amounts are in millisatoshis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostEvent {
    /// Upstream-assigned, strictly increasing identifier.
    pub index: u64,
    /// Unix timestamp in seconds.
    #[serde(rename = "time")]
    pub timestamp: i64,
    /// Portion actually received.
    pub value_msat: i64,
    /// Total amount including splits and fees.
    pub value_msat_total: i64,
    /// Kind of payment.
    pub action: ActionType,
    /// Sender display name.
    pub sender: String,
    /// App the payment was sent from.
    pub app: String,
    /// Attached message.
    pub message: String,
    /// Podcast name.
    pub podcast: String,
    /// Episode name.
    pub episode: String,
    /// Raw TLV blob, JSON encoded.
    pub tlv: String,
    /// Podcast the listener was playing when the payment targeted a remote item.
    pub remote_podcast: Option<String>,
    /// Episode the listener was playing when the payment targeted a remote item.
    pub remote_episode: Option<String>,
    /// Whether a reply was already sent for this event.
    pub reply_sent: bool,
    /// Keysend custom record key.
    pub custom_key: Option<u64>,
    /// Keysend custom record value.
    pub custom_value: Option<String>,
    /// Settlement details.
    pub payment_info: Option<PaymentInfo>,
    /// Server-prepared playback requests.
    pub effects: Vec<EventEffect>,
}

impl BoostEvent {
    /// Whole sats shown for this event: the total, or the received value if
    /// the total rounds to zero.
    pub fn display_sats(&self) -> i64 {
        match self.value_msat_total / 1000 {
            0 => self.value_msat / 1000,
            sats => sats,
        }
    }

    /// Whole sats actually received.
    pub fn received_sats(&self) -> i64 {
        self.value_msat / 1000
    }

    /// Best-effort parse of the TLV blob.
    pub fn tlv_data(&self) -> TlvData {
        TlvData::parse(&self.tlv)
    }
}

/// # TLV Data
///
/// The handful of TLV fields this client uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlvData {
    /// Recipient name. Shown as the counterpart in the sent view.
    pub name: Option<String>,
    /// Lightning address or node to reply to.
    pub reply_address: Option<String>,
    /// Keysend custom key to use for a reply.
    pub reply_custom_key: Option<String>,
    /// Keysend custom value to use for a reply.
    pub reply_custom_value: Option<String>,
    /// Feed guid of the remote item being played.
    pub remote_feed_guid: Option<String>,
    /// Item guid of the remote item being played.
    pub remote_item_guid: Option<String>,
}

impl TlvData {
    /// Parses a TLV JSON blob. Anything that is not a JSON object degrades to
    /// an empty value.
    pub fn parse(raw: &str) -> Self {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                if !raw.trim().is_empty() {
                    tracing::debug!("Unparseable TLV ignored: {}", e);
                }
                return Self::default();
            }
        };

        let text = |key: &str| -> Option<String> {
            match value.get(key)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        };

        Self {
            name: text("name"),
            reply_address: text("reply_address"),
            reply_custom_key: text("reply_custom_key"),
            reply_custom_value: text("reply_custom_value"),
            remote_feed_guid: text("remote_feed_guid"),
            remote_item_guid: text("remote_item_guid"),
        }
    }
}
