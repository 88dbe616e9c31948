//! # Tracing Setup
//!
//! Installs the global subscriber: an `EnvFilter`, a colored console layer and
//! a JSON file layer written through a daily rolling, non-blocking appender.
//!
//! ## Key Design Principles:
//! - **Caller Owns the Guard**: the appender's [`WorkerGuard`] is returned, not
//!   stashed in a static. Dropping it flushes buffered lines, so `main` keeps
//!   it alive until shutdown.
//! - **Environment First**: `RUST_LOG` overrides the configured level.

use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is not set, e.g. `info` or
    /// `lib_boostwatch=debug`.
    pub level: String,
    /// Directory for the rolling JSON files. Created if missing.
    pub log_dir: PathBuf,
    /// File name prefix; the appender adds the date.
    pub file_prefix: String,
    /// Also log to the console.
    pub console: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            file_prefix: "boostwatch".to_string(),
            console: true,
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
/// Fails if the log directory cannot be created, the filter directive is
/// invalid, or a global subscriber is already installed.
pub fn setup_logging(options: &LogOptions) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(&options.log_dir)?;

    let file_appender = rolling::daily(&options.log_dir, &options.file_prefix);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = options
        .console
        .then(|| fmt::layer().with_target(true).with_ansi(true));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(guard)
}
