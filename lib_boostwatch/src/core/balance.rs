//! # Balance Tracker
//!
//! Turns raw `/api/v1/balance` readings into indicator changes. Only state
//! changes produce an effect, so a steady balance is silent.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, warn};

use super::view::{BalanceDisplay, ViewEffect};
use crate::retrieve::{FeedApi, FeedError};

#[derive(Debug, Default)]
struct Reading {
    last: Option<i64>,
    error: Option<String>,
}

/// # Balance Tracker
///
/// Cheap to clone; clones share the last reading.
#[derive(Debug, Clone, Default)]
pub struct BalanceTracker {
    reading: Arc<Mutex<Reading>>,
}

fn as_sats(raw: &Value) -> Option<i64> {
    raw.as_i64()
        .or_else(|| raw.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
}

impl BalanceTracker {
    /// Tracker with no reading yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last valid balance.
    pub fn last(&self) -> Option<i64> {
        self.lock().last
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Reading> {
        self.reading.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a raw reading. Returns the indicator change, if any.
    pub fn observe(&self, raw: &Value) -> Option<ViewEffect> {
        let mut reading = self.lock();
        match as_sats(raw) {
            Some(amount) => {
                let unchanged = reading.last == Some(amount) && reading.error.is_none();
                let increased = reading.last.is_some_and(|prev| amount > prev);
                reading.last = Some(amount);
                reading.error = None;
                if unchanged {
                    return None;
                }
                if increased {
                    debug!(amount, "balance went up");
                }
                Some(ViewEffect::Balance(BalanceDisplay::Sats { amount, increased }))
            }
            None => self.record_error(&mut reading, format!("unexpected balance: {}", raw)),
        }
    }

    fn record_error(&self, reading: &mut Reading, reason: String) -> Option<ViewEffect> {
        if reading.error.as_deref() == Some(reason.as_str()) {
            return None;
        }
        reading.error = Some(reason.clone());
        Some(ViewEffect::Balance(BalanceDisplay::Error(reason)))
    }

    /// Fetches and records the balance.
    ///
    /// A 403 yields [`ViewEffect::RedirectToLogin`]. A non-numeric body
    /// yields an error indicator. Transport failures are logged and skipped.
    pub async fn refresh(&self, api: &FeedApi) -> Option<ViewEffect> {
        match api.fetch_balance().await {
            Ok(raw) => self.observe(&raw),
            Err(FeedError::Unauthorized) => Some(ViewEffect::RedirectToLogin),
            Err(FeedError::Decode(reason)) => {
                let mut reading = self.lock();
                self.record_error(&mut reading, reason)
            }
            Err(e) => {
                warn!("balance refresh skipped: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_changes_are_reported() {
        let tracker = BalanceTracker::new();
        assert_eq!(
            tracker.observe(&json!(1000)),
            Some(ViewEffect::Balance(BalanceDisplay::Sats {
                amount: 1000,
                increased: false
            }))
        );
        assert_eq!(tracker.observe(&json!(1000)), None);
        assert_eq!(
            tracker.observe(&json!(1500.7)),
            Some(ViewEffect::Balance(BalanceDisplay::Sats {
                amount: 1500,
                increased: true
            }))
        );
        assert_eq!(
            tracker.observe(&json!(900)),
            Some(ViewEffect::Balance(BalanceDisplay::Sats {
                amount: 900,
                increased: false
            }))
        );
        assert_eq!(tracker.last(), Some(900));
    }

    #[test]
    fn non_numbers_show_an_error_once_then_recover() {
        let tracker = BalanceTracker::new();
        tracker.observe(&json!(10));
        let err = tracker.observe(&json!("node offline"));
        assert!(matches!(err, Some(ViewEffect::Balance(BalanceDisplay::Error(_)))));
        assert_eq!(tracker.observe(&json!("node offline")), None);
        assert_eq!(
            tracker.observe(&json!(10)),
            Some(ViewEffect::Balance(BalanceDisplay::Sats {
                amount: 10,
                increased: false
            }))
        );
    }
}
