//! # Triggers
//!
//! Notification cues for new events and the queue that keeps their playback
//! from overlapping.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Rodio-backed cue player.
#[cfg(feature = "audio")]
pub mod audio;
/// Cue types and the player seam.
pub mod cues;
/// Single-flight FIFO playback queue.
pub mod queue;

#[cfg(feature = "audio")]
pub use audio::RodioCuePlayer;
pub use cues::{Cue, CueError, CuePlayer, MidiCue, SilentCuePlayer, SoundCue, Trigger};
pub use queue::{Submitted, TriggerQueue};
