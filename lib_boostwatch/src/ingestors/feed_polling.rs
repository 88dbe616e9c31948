//! # Feed Polling Ingestor
//!
//! Timer-driven driver for a [`Reconciler`]: polls the feed, refreshes the
//! balance and the relative ages, and forwards everything the session emits
//! to the renderer over a channel.
//!
//! ## Key Design Principles:
//! - **One Task per Activity**: polling, balance and age refresh each run as
//!   their own cancellable periodic task. Cancelling the shared token stops
//!   all of them.
//! - **Skip, Don't Stop**: transport failures are logged and the next tick
//!   simply tries again.
//! - **Authorization Ends the Session**: a 403 anywhere sends
//!   [`ViewEffect::RedirectToLogin`] and cancels the token.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{PollOutcome, Reconciler, TimelineView, ViewEffect};
use crate::retrieve::FeedError;
use crate::utils::periodic::spawn_periodic;

/// What the renderer receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineUpdate {
    /// An effect from the session.
    Effect(ViewEffect),
    /// Time to re-render relative ages.
    RefreshAges(DateTime<Utc>),
}

/// Applies updates to `view` until every sender is gone.
pub async fn drive_view<V: TimelineView>(mut updates: UnboundedReceiver<TimelineUpdate>, view: &mut V) {
    while let Some(update) = updates.recv().await {
        match update {
            TimelineUpdate::Effect(effect) => view.apply(&effect),
            TimelineUpdate::RefreshAges(now) => view.refresh_ages(now),
        }
    }
}

/// Forwards a session result to the renderer. Returns `false` once the
/// session has lost authorization.
pub fn forward_outcome(
    context: &str,
    result: Result<PollOutcome, FeedError>,
    updates: &UnboundedSender<TimelineUpdate>,
    cancel: &CancellationToken,
) -> bool {
    match result {
        Ok(outcome) => {
            send_all(updates, outcome.effects);
            true
        }
        Err(e) => handle_error(context, e, updates, cancel),
    }
}

fn send_all(updates: &UnboundedSender<TimelineUpdate>, effects: Vec<ViewEffect>) {
    for effect in effects {
        if updates.send(TimelineUpdate::Effect(effect)).is_err() {
            debug!("renderer gone, dropping effects");
            return;
        }
    }
}

fn handle_error(
    context: &str,
    err: FeedError,
    updates: &UnboundedSender<TimelineUpdate>,
    cancel: &CancellationToken,
) -> bool {
    match err {
        FeedError::Unauthorized => {
            if !cancel.is_cancelled() {
                warn!("{}: authorization denied, redirecting to login", context);
                let _ = updates.send(TimelineUpdate::Effect(ViewEffect::RedirectToLogin));
                cancel.cancel();
            }
            false
        }
        e => {
            warn!("{} skipped: {}", context, e);
            true
        }
    }
}

/// # Feed Poller
///
/// Owns the periodic activities of one session.
pub struct FeedPoller {
    reconciler: Reconciler,
    updates: UnboundedSender<TimelineUpdate>,
    poll_interval: Duration,
    balance_interval: Duration,
    age_refresh: Duration,
}

impl FeedPoller {
    /// Poller with the usual cadence: feed and balance every 7 seconds, ages
    /// every minute.
    pub fn new(reconciler: Reconciler, updates: UnboundedSender<TimelineUpdate>) -> Self {
        Self {
            reconciler,
            updates,
            poll_interval: Duration::from_secs(7),
            balance_interval: Duration::from_secs(7),
            age_refresh: Duration::from_secs(60),
        }
    }

    /// Overrides the periods.
    pub fn with_intervals(mut self, poll: Duration, balance: Duration, age_refresh: Duration) -> Self {
        self.poll_interval = poll;
        self.balance_interval = balance;
        self.age_refresh = age_refresh;
        self
    }

    /// Spawns the feed, balance and age tasks. They stop when `cancel` fires,
    /// which they also do themselves on a 403.
    pub fn spawn(self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(3);

        let reconciler = self.reconciler.clone();
        let updates = self.updates.clone();
        let token = cancel.clone();
        handles.push(spawn_periodic("feed-poll", self.poll_interval, cancel.clone(), move || {
            let reconciler = reconciler.clone();
            let updates = updates.clone();
            let token = token.clone();
            async move {
                let result = reconciler.tick().await;
                forward_outcome("feed poll", result, &updates, &token);
            }
        }));

        let reconciler = self.reconciler.clone();
        let updates = self.updates.clone();
        let token = cancel.clone();
        handles.push(spawn_periodic("balance", self.balance_interval, cancel.clone(), move || {
            let reconciler = reconciler.clone();
            let updates = updates.clone();
            let token = token.clone();
            async move {
                match reconciler.refresh_balance().await {
                    Ok(Some(effect)) => send_all(&updates, vec![effect]),
                    Ok(None) => {}
                    Err(e) => {
                        handle_error("balance refresh", e, &updates, &token);
                    }
                }
            }
        }));

        let updates = self.updates;
        handles.push(spawn_periodic("age-refresh", self.age_refresh, cancel, move || {
            let _ = updates.send(TimelineUpdate::RefreshAges(Utc::now()));
            async {}
        }));

        handles
    }
}
