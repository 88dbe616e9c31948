//! # Playback Cues
//!
//! A [`Trigger`] bundles the cues to play, all at once, for one event. Cues are
//! executed through the [`CuePlayer`] seam so the queue never knows whether it
//! drives speakers, a log, or a test double.

use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tracing::info;

/// Errors from a single cue. Never escapes the trigger queue.
#[derive(Debug, Error)]
pub enum CueError {
    /// The sound file could not be fetched.
    #[error("failed to fetch sound '{file}': {reason}")]
    Fetch {
        /// Requested file.
        file: String,
        /// Underlying failure.
        reason: String,
    },
    /// The sound data could not be decoded.
    #[error("failed to decode sound '{file}': {reason}")]
    Decode {
        /// Requested file.
        file: String,
        /// Underlying failure.
        reason: String,
    },
    /// No usable audio output.
    #[error("audio output unavailable: {0}")]
    Output(String),
}

/// A sound file to play to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundCue {
    /// Path relative to the server, or an absolute URL.
    pub file: String,
    /// Display name.
    pub name: String,
}

impl SoundCue {
    /// Cue for `file`, named after the file itself.
    pub fn new(file: impl Into<String>) -> Self {
        let file = file.into();
        let name = file.rsplit('/').next().unwrap_or_default().to_string();
        Self { file, name }
    }
}

/// A single MIDI-style note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiCue {
    /// Note number, 60 is middle C.
    pub note: u8,
    /// Note-on velocity, 1..=127.
    pub velocity: u8,
    /// One-based channel.
    pub channel: u8,
    /// How long the note is held.
    pub duration: Duration,
}

impl Default for MidiCue {
    fn default() -> Self {
        Self {
            note: 60,
            velocity: 100,
            channel: 1,
            duration: Duration::from_millis(500),
        }
    }
}

impl MidiCue {
    /// Builds a cue, replacing missing or zero values with the defaults.
    pub fn with_fallbacks(
        note: Option<u8>,
        velocity: Option<u8>,
        channel: Option<u8>,
        duration_ms: Option<u64>,
    ) -> Self {
        let defaults = Self::default();
        let nonzero = |v: Option<u8>, d: u8| v.filter(|v| *v != 0).unwrap_or(d);
        Self {
            note: nonzero(note, defaults.note),
            velocity: nonzero(velocity, defaults.velocity),
            channel: nonzero(channel, defaults.channel),
            duration: duration_ms
                .filter(|d| *d != 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.duration),
        }
    }

    /// Equal-tempered frequency of the note, A4 = 440 Hz.
    pub fn frequency(&self) -> f32 {
        440.0 * 2f32.powf((f32::from(self.note) - 69.0) / 12.0)
    }
}

/// One thing to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    /// Sound file.
    Sound(SoundCue),
    /// Note.
    Midi(MidiCue),
}

/// # Trigger
///
/// Cues to start together for one event. Created per event, consumed once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trigger {
    /// Index of the event that caused it.
    pub event_index: u64,
    /// Cues started concurrently.
    pub cues: Vec<Cue>,
}

impl Trigger {
    /// Trigger with no cues yet.
    pub fn new(event_index: u64) -> Self {
        Self {
            event_index,
            cues: Vec::new(),
        }
    }

    /// Adds a sound cue.
    pub fn with_sound(mut self, cue: SoundCue) -> Self {
        self.cues.push(Cue::Sound(cue));
        self
    }

    /// Adds a note cue.
    pub fn with_midi(mut self, cue: MidiCue) -> Self {
        self.cues.push(Cue::Midi(cue));
        self
    }

    /// True when there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

/// # Cue Player
///
/// Plays one cue and resolves when it has finished.
pub trait CuePlayer: Send + Sync + 'static {
    /// Starts `cue`. The future completes once playback is over.
    fn play(&self, cue: Cue) -> BoxFuture<'static, Result<(), CueError>>;
}

/// # Silent Cue Player
///
/// Logs every cue and holds for its duration. Used when there is no audio
/// output.
#[derive(Debug, Clone)]
pub struct SilentCuePlayer {
    sound_hold: Duration,
}

impl SilentCuePlayer {
    /// `sound_hold` is how long a sound cue is considered to be playing.
    pub fn new(sound_hold: Duration) -> Self {
        Self { sound_hold }
    }
}

impl Default for SilentCuePlayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(750))
    }
}

impl CuePlayer for SilentCuePlayer {
    fn play(&self, cue: Cue) -> BoxFuture<'static, Result<(), CueError>> {
        let hold = match &cue {
            Cue::Sound(sound) => {
                info!(file = %sound.file, "pew: {}", sound.name);
                self.sound_hold
            }
            Cue::Midi(midi) => {
                info!(note = midi.note, velocity = midi.velocity, channel = midi.channel, "pew: midi");
                midi.duration
            }
        };
        Box::pin(async move {
            tokio::time::sleep(hold).await;
            Ok(())
        })
    }
}
