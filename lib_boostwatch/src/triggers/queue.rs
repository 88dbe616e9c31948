//! # Trigger Queue
//!
//! Serializes trigger playback so bursts of events never overlap.
//!
//! ## Key Design Principles:
//! - **Single Flight**: at most one trigger is `Playing` at any time. A trigger
//!   submitted while idle with an empty backlog starts at once; everything else
//!   waits in FIFO order.
//! - **Tick Driven**: a periodic tick moves the head of the backlog into
//!   playback once the current trigger is done.
//! - **Join Semantics**: every cue of a trigger starts concurrently and the
//!   trigger completes when all of them have, whatever their outcome.
//! - **Always Recovers**: cue errors and panics are logged and swallowed. The
//!   queue returns to idle no matter what the cues did.
//! - **Never Drops**: the backlog is unbounded. Past a threshold it logs a
//!   warning, nothing more.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::cues::{CuePlayer, Trigger};
use crate::utils::periodic::spawn_periodic;

/// Default backlog size past which each new submission logs a warning.
pub const DEFAULT_BACKLOG_WARNING: usize = 50;

/// Outcome of [`TriggerQueue::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Playback started immediately.
    Started,
    /// Queued; the value is the backlog length including this trigger.
    Queued(usize),
}

#[derive(Debug, Default)]
struct QueueState {
    playing: bool,
    pending: VecDeque<Trigger>,
}

struct Shared {
    player: Arc<dyn CuePlayer>,
    state: Mutex<QueueState>,
    backlog_warning: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run(&self, trigger: Trigger) {
        let index = trigger.event_index;
        debug!(index, cues = trigger.cues.len(), "trigger started");

        let handles: Vec<JoinHandle<_>> = trigger
            .cues
            .into_iter()
            .map(|cue| tokio::spawn(self.player.play(cue)))
            .collect();

        for outcome in join_all(handles).await {
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(index, "cue failed: {}", e),
                Err(e) => error!(index, "cue task aborted: {}", e),
            }
        }

        self.lock().playing = false;
        debug!(index, "trigger finished");
    }
}

/// # Trigger Queue
///
/// Cheap to clone; clones share the same backlog and playing state.
#[derive(Clone)]
pub struct TriggerQueue {
    shared: Arc<Shared>,
}

impl TriggerQueue {
    /// Queue playing through `player`.
    pub fn new(player: Arc<dyn CuePlayer>) -> Self {
        Self::with_backlog_warning(player, DEFAULT_BACKLOG_WARNING)
    }

    /// Queue with a custom backlog warning threshold.
    pub fn with_backlog_warning(player: Arc<dyn CuePlayer>, backlog_warning: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                player,
                state: Mutex::new(QueueState::default()),
                backlog_warning,
            }),
        }
    }

    /// Plays `trigger` now if idle with an empty backlog, otherwise appends it
    /// to the backlog. Must be called from within a tokio runtime.
    pub fn submit(&self, trigger: Trigger) -> Submitted {
        let mut state = self.shared.lock();
        if !state.playing && state.pending.is_empty() {
            state.playing = true;
            drop(state);
            self.execute(trigger);
            return Submitted::Started;
        }

        state.pending.push_back(trigger);
        let backlog = state.pending.len();
        if backlog > self.shared.backlog_warning {
            warn!(backlog, "trigger backlog is growing");
        }
        Submitted::Queued(backlog)
    }

    /// Starts the head of the backlog if idle. Returns whether it did.
    pub fn tick(&self) -> bool {
        let mut state = self.shared.lock();
        if state.playing {
            return false;
        }
        let Some(trigger) = state.pending.pop_front() else {
            return false;
        };
        state.playing = true;
        drop(state);
        self.execute(trigger);
        true
    }

    /// Whether a trigger is currently playing.
    pub fn is_playing(&self) -> bool {
        self.shared.lock().playing
    }

    /// Number of triggers waiting.
    pub fn backlog(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Runs [`tick`](Self::tick) every `period` until `cancel` fires.
    pub fn spawn_scheduler(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let queue = self.clone();
        spawn_periodic("trigger-queue", period, cancel, move || {
            queue.tick();
            async {}
        })
    }

    fn execute(&self, trigger: Trigger) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.run(trigger).await });
    }
}
