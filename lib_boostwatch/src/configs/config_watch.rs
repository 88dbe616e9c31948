//! # Watcher Configuration
//!
//! Every option is optional at every layer. Layers are merged field by field,
//! later layers winning:
//!
//! 1. built-in defaults,
//! 2. the JSON config file (`boostwatch.json` unless `--config-path` says
//!    otherwise; a missing file is fine, a broken one is logged and skipped),
//! 3. environment variables (`BOOSTWATCH_*`, `.env` included) and CLI flags.
//!
//! The merged [`WatchConfig`] is then resolved into [`Settings`], where every
//! value is concrete and validated.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::core::{FeedView, SessionSettings};
use crate::retrieve::ClientOptions;

/// Config file read when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "boostwatch.json";

/// Fixed period of the relative-age refresh.
const AGE_REFRESH: Duration = Duration::from_secs(60);

/// Problems turning the merged configuration into settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bad command line. Includes `--help` and `--version`.
    #[error(transparent)]
    Cli(#[from] clap::Error),
    /// A URL option did not parse.
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        /// Option name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// Any other unusable value.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// Option name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(name = "boostwatch", about = "Live terminal timeline for a boost/stream payment feed", version)]
#[serde(rename_all = "camelCase")]
/// # Watch Config
///
/// One configuration layer. `None` means "not set here".
pub struct WatchConfig {
    /// Feed server base URL.
    #[clap(long, env = "BOOSTWATCH_BASE_URL", help = "Base URL of the feed server.")]
    pub base_url: Option<String>,

    /// WebSocket push URL.
    #[clap(long, env = "BOOSTWATCH_WS_URL", help = "WebSocket push endpoint. Derived from the base URL when omitted.")]
    pub ws_url: Option<String>,

    /// Use the push channel at all.
    #[clap(long, env = "BOOSTWATCH_WEBSOCKET", help = "Also listen on the WebSocket push channel (true/false).")]
    pub websocket: Option<bool>,

    /// Feed to follow.
    #[clap(long, env = "BOOSTWATCH_VIEW", help = "Feed to follow: boosts, streams or sent.")]
    pub view: Option<String>,

    /// Minimum amount shown.
    #[clap(long, env = "BOOSTWATCH_MIN_SATS", help = "Hide events below this many sats.")]
    pub min_sats: Option<i64>,

    /// Sound on new events.
    #[clap(long, env = "BOOSTWATCH_PLAYBACK", help = "Play cues for new events (true/false).")]
    pub playback: Option<bool>,

    /// Real audio output.
    #[clap(long, env = "BOOSTWATCH_AUDIO", help = "Play cues on the sound card instead of logging them (true/false).")]
    pub audio: Option<bool>,

    /// Show the received amount instead of the total.
    #[clap(long, env = "BOOSTWATCH_SHOW_RECEIVED_SATS", help = "Show received sats instead of the total (true/false).")]
    pub show_received_sats: Option<bool>,

    /// Poll period.
    #[clap(long, env = "BOOSTWATCH_POLL_INTERVAL_SECS", help = "Seconds between feed polls.")]
    pub poll_interval_secs: Option<u64>,

    /// Balance period.
    #[clap(long, env = "BOOSTWATCH_BALANCE_INTERVAL_SECS", help = "Seconds between balance refreshes.")]
    pub balance_interval_secs: Option<u64>,

    /// Trigger queue tick.
    #[clap(long, env = "BOOSTWATCH_TRIGGER_TICK_MS", help = "Milliseconds between trigger queue ticks.")]
    pub trigger_tick_ms: Option<u64>,

    /// Per-request timeout.
    #[clap(long, env = "BOOSTWATCH_REQUEST_TIMEOUT_SECS", help = "Per-request HTTP timeout in seconds.")]
    pub request_timeout_secs: Option<u64>,

    /// Retry budget for transient failures.
    #[clap(long, env = "BOOSTWATCH_MAX_RETRIES", help = "Retries for transient HTTP failures.")]
    pub max_retries: Option<u32>,

    /// Bearer token.
    #[clap(long, env = "BOOSTWATCH_AUTH_TOKEN", help = "Bearer token sent with every request.")]
    pub auth_token: Option<String>,

    /// Log file directory.
    #[clap(long, env = "BOOSTWATCH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    /// Log filter.
    #[clap(long, env = "BOOSTWATCH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    /// Config file path.
    #[clap(long, env = "BOOSTWATCH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,
}

impl WatchConfig {
    /// Built-in defaults.
    pub fn defaults() -> Self {
        Self {
            base_url: Some("http://127.0.0.1:2112/".to_string()),
            websocket: Some(false),
            view: Some("boosts".to_string()),
            min_sats: Some(0),
            playback: Some(true),
            audio: Some(false),
            show_received_sats: Some(false),
            poll_interval_secs: Some(7),
            balance_interval_secs: Some(7),
            trigger_tick_ms: Some(1000),
            request_timeout_secs: Some(10),
            max_retries: Some(3),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    /// Merges two layers; `other` wins wherever it is set.
    pub fn merge(self, other: WatchConfig) -> WatchConfig {
        WatchConfig {
            base_url: other.base_url.or(self.base_url),
            ws_url: other.ws_url.or(self.ws_url),
            websocket: other.websocket.or(self.websocket),
            view: other.view.or(self.view),
            min_sats: other.min_sats.or(self.min_sats),
            playback: other.playback.or(self.playback),
            audio: other.audio.or(self.audio),
            show_received_sats: other.show_received_sats.or(self.show_received_sats),
            poll_interval_secs: other.poll_interval_secs.or(self.poll_interval_secs),
            balance_interval_secs: other.balance_interval_secs.or(self.balance_interval_secs),
            trigger_tick_ms: other.trigger_tick_ms.or(self.trigger_tick_ms),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            max_retries: other.max_retries.or(self.max_retries),
            auth_token: other.auth_token.or(self.auth_token),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            config_path: other.config_path.or(self.config_path),
        }
    }

    /// Resolves the merged layers into concrete settings.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let defaults = Self::defaults();
        let merged = defaults.merge(self);

        let base_url = parse_url("base url", merged.base_url.unwrap_or_default())?;
        let ws_url = merged
            .ws_url
            .map(|raw| parse_url("ws url", raw))
            .transpose()?;

        let view = merged
            .view
            .unwrap_or_default()
            .parse::<FeedView>()
            .map_err(|reason| ConfigError::InvalidValue { field: "view", reason })?;

        let session = SessionSettings {
            min_sats: merged.min_sats.unwrap_or_default(),
            playback: merged.playback.unwrap_or(true),
            show_received_sats: merged.show_received_sats.unwrap_or_default(),
            ..Default::default()
        };

        let client = ClientOptions {
            timeout: Duration::from_secs(positive("request timeout", merged.request_timeout_secs)?),
            max_retries: merged.max_retries.unwrap_or_default(),
            ..Default::default()
        };

        Ok(Settings {
            base_url,
            ws_url,
            websocket: merged.websocket.unwrap_or_default(),
            view,
            session,
            audio: merged.audio.unwrap_or_default(),
            poll_interval: Duration::from_secs(positive("poll interval", merged.poll_interval_secs)?),
            balance_interval: Duration::from_secs(positive("balance interval", merged.balance_interval_secs)?),
            trigger_tick: Duration::from_millis(positive("trigger tick", merged.trigger_tick_ms)?),
            age_refresh: AGE_REFRESH,
            client,
            auth_token: merged.auth_token.filter(|t| !t.is_empty()),
            log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_url(field: &'static str, raw: String) -> Result<Url, ConfigError> {
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn positive(field: &'static str, value: Option<u64>) -> Result<u64, ConfigError> {
    match value {
        Some(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        }),
    }
}

/// # Settings
///
/// Fully resolved watcher settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Feed server base URL.
    pub base_url: Url,
    /// Explicit push endpoint, if configured.
    pub ws_url: Option<Url>,
    /// Listen on the push channel.
    pub websocket: bool,
    /// Feed to follow.
    pub view: FeedView,
    /// Session settings.
    pub session: SessionSettings,
    /// Use the sound card.
    pub audio: bool,
    /// Feed poll period.
    pub poll_interval: Duration,
    /// Balance refresh period.
    pub balance_interval: Duration,
    /// Trigger queue tick period.
    pub trigger_tick: Duration,
    /// Relative-age refresh period.
    pub age_refresh: Duration,
    /// HTTP client tunables.
    pub client: ClientOptions,
    /// Bearer token.
    pub auth_token: Option<String>,
    /// Log directory.
    pub log_dir: PathBuf,
    /// Log filter.
    pub log_level: String,
}

fn read_config_file(path: &Path) -> Option<WatchConfig> {
    if !path.exists() {
        info!("Config file not found at {}. Using defaults and environment/CLI values.", path.display());
        return None;
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str::<WatchConfig>(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

/// Loads the configuration from `args` (first item is the program name) and
/// the current environment.
pub fn load_config_from<I, T>(args: I) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = WatchConfig::try_parse_from(args)?;

    let config_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut merged = WatchConfig::defaults();
    if let Some(file_config) = read_config_file(&config_path) {
        merged = merged.merge(file_config);
    }
    merged.merge(cli).resolve()
}

/// Loads `.env`, then the configuration from the process arguments.
pub fn load_config() -> Result<Settings, ConfigError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!("Ignoring unreadable .env file: {}", e);
        }
    }
    load_config_from(std::env::args_os())
}
