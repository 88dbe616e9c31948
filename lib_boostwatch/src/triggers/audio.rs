//! # Rodio Cue Player
//!
//! Plays cues on the default audio output. Sound files are fetched from the
//! feed server on every play with a cache-busting query, then decoded and
//! played to their end. Note cues are rendered as a sine tone.
//!
//! Output devices are opened per cue on a blocking thread, since the rodio
//! stream handle is neither `Send` nor async.

use std::io::Cursor;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use url::Url;

use super::cues::{Cue, CueError, CuePlayer, MidiCue, SoundCue};

/// Peak amplitude for a velocity-127 note.
const TONE_CEILING: f32 = 0.25;

/// # Rodio Cue Player
pub struct RodioCuePlayer {
    http: reqwest::Client,
    base_url: Url,
}

impl RodioCuePlayer {
    /// Player resolving relative sound paths against `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn sound_url(&self, sound: &SoundCue) -> Result<Url, CueError> {
        let resolved = if sound.file.starts_with("http://") || sound.file.starts_with("https://") {
            Url::parse(&sound.file)
        } else {
            self.base_url.join(&sound.file)
        };
        let mut url = resolved.map_err(|e| CueError::Fetch {
            file: sound.file.clone(),
            reason: e.to_string(),
        })?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        url.query_pairs_mut().append_pair("h", &stamp.to_string());
        Ok(url)
    }
}

fn open_output() -> Result<OutputStream, CueError> {
    let mut stream =
        OutputStreamBuilder::open_default_stream().map_err(|e| CueError::Output(e.to_string()))?;
    stream.log_on_drop(false);
    Ok(stream)
}

fn play_bytes(file: String, data: Vec<u8>) -> Result<(), CueError> {
    let stream = open_output()?;
    let source = Decoder::new(Cursor::new(data)).map_err(|e| CueError::Decode {
        file,
        reason: e.to_string(),
    })?;
    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

fn play_tone(midi: MidiCue) -> Result<(), CueError> {
    let stream = open_output()?;
    let gain = f32::from(midi.velocity.min(127)) / 127.0 * TONE_CEILING;
    let tone = SineWave::new(midi.frequency())
        .take_duration(midi.duration)
        .amplify(gain);
    let sink = Sink::connect_new(stream.mixer());
    sink.append(tone);
    sink.sleep_until_end();
    Ok(())
}

async fn fetch(http: reqwest::Client, file: &str, url: Url) -> Result<Vec<u8>, CueError> {
    let failed = |e: reqwest::Error| CueError::Fetch {
        file: file.to_string(),
        reason: e.to_string(),
    };
    let response = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(failed)?;
    let body = response.bytes().await.map_err(failed)?;
    Ok(body.to_vec())
}

impl CuePlayer for RodioCuePlayer {
    fn play(&self, cue: Cue) -> BoxFuture<'static, Result<(), CueError>> {
        match cue {
            Cue::Sound(sound) => {
                let http = self.http.clone();
                let url = self.sound_url(&sound);
                Box::pin(async move {
                    let data = fetch(http, &sound.file, url?).await?;
                    tracing::debug!(file = %sound.file, bytes = data.len(), "playing sound");
                    tokio::task::spawn_blocking(move || play_bytes(sound.file, data))
                        .await
                        .map_err(|e| CueError::Output(e.to_string()))?
                })
            }
            Cue::Midi(midi) => Box::pin(async move {
                tokio::task::spawn_blocking(move || play_tone(midi))
                    .await
                    .map_err(|e| CueError::Output(e.to_string()))?
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sounds_resolve_against_the_server_with_cache_buster() {
        let player = RodioCuePlayer::new(
            reqwest::Client::new(),
            Url::parse("http://node.local:2112/").unwrap(),
        );
        let url = player.sound_url(&SoundCue::new("/sounds/pew.mp3")).unwrap();
        assert_eq!(url.host_str(), Some("node.local"));
        assert_eq!(url.path(), "/sounds/pew.mp3");
        assert!(url.query().unwrap().starts_with("h="));

        let external = player
            .sound_url(&SoundCue::new("https://cdn.example.com/a.wav"))
            .unwrap();
        assert_eq!(external.host_str(), Some("cdn.example.com"));
    }
}
