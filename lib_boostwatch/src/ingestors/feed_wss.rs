//! # Feed Push Ingestor
//!
//! WebSocket client for the server's push channel. Frames are JSON arrays
//! `[eventName, ...args]`; payment events go through the same filter and
//! merge path as a forward poll, so a pushed event and a polled copy of it
//! deduplicate against each other.
//!
//! On disconnect or a failed connect the ingestor waits a fixed delay and
//! reconnects, until cancelled.

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::feed_polling::{TimelineUpdate, forward_outcome};
use crate::core::{FeedView, Reconciler};
use crate::feed::BoostEvent;

/// Delay between reconnect attempts.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A recognized push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// `boost`, `stream` or `payment` with the event as first argument. The
    /// frame name decides which view the event belongs to.
    Payment {
        /// View named by the frame.
        view: FeedView,
        /// The pushed event.
        event: BoostEvent,
    },
    /// `balance` with the raw balance as first argument.
    Balance(Value),
}

impl PushEvent {
    /// Parses a text frame. Unknown names and malformed frames give `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let frame: Vec<Value> = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("ignoring non-array push frame: {}", e);
                return None;
            }
        };
        let mut parts = frame.into_iter();
        let name = parts.next()?;
        let arg = parts.next();

        let name = name.as_str()?;
        let view = match name {
            "boost" => Some(FeedView::Boosts),
            "stream" => Some(FeedView::Streams),
            "payment" => Some(FeedView::Sent),
            _ => None,
        };
        match (name, view, arg) {
            (_, Some(view), Some(raw)) => match serde_json::from_value(raw) {
                Ok(event) => Some(PushEvent::Payment { view, event }),
                Err(e) => {
                    warn!("malformed pushed event: {}", e);
                    None
                }
            },
            ("balance", _, Some(raw)) => Some(PushEvent::Balance(raw)),
            (other, _, _) => {
                debug!(event = other, "ignoring push frame");
                None
            }
        }
    }
}

/// Push endpoint for a server base URL: `api/v1/ws` with `http` mapped to
/// `ws` and `https` to `wss`.
pub fn derive_ws_url(base: &Url) -> Result<Url, url::ParseError> {
    let mut url = base.join("api/v1/ws")?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        _ => return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase),
    };
    url.set_scheme(scheme)
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
    Ok(url)
}

/// # Feed Push Ingestor
pub struct FeedPushIngestor {
    url: Url,
    reconciler: Reconciler,
    updates: UnboundedSender<TimelineUpdate>,
    reconnect_delay: Duration,
}

impl FeedPushIngestor {
    /// Ingestor connecting to `url`.
    pub fn new(url: Url, reconciler: Reconciler, updates: UnboundedSender<TimelineUpdate>) -> Self {
        Self {
            url,
            reconciler,
            updates,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Main loop: connect, read until the socket drops, wait, reconnect.
    pub async fn run(&self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            info!("Connecting to push channel: {}", self.url);

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((ws_stream, _)) => {
                    info!("Push channel connected.");
                    let (_write, mut read) = ws_stream.split();
                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => return,
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if !self.handle_frame(text.as_str(), &cancel).await {
                                        return;
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("Push channel closed by remote host.");
                                    break;
                                }
                                Some(Err(e)) => {
                                    error!("Push channel read error: {}", e);
                                    break;
                                }
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to connect to push channel: {}.", e);
                }
            }

            debug!(delay = ?self.reconnect_delay, "reconnecting push channel");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Returns `false` once the session has lost authorization.
    async fn handle_frame(&self, text: &str, cancel: &CancellationToken) -> bool {
        match PushEvent::parse(text) {
            Some(PushEvent::Payment { view, event }) => {
                let result = self.reconciler.ingest_pushed(view, vec![event]).await;
                forward_outcome("pushed event", result, &self.updates, cancel)
            }
            Some(PushEvent::Balance(raw)) => {
                if let Some(effect) = self.reconciler.observe_balance(&raw) {
                    let _ = self.updates.send(TimelineUpdate::Effect(effect));
                }
                true
            }
            None => true,
        }
    }
}
