//! # Boostwatch
//!
//! Terminal client for a boost/stream payment feed. Shows incoming payments
//! as a live timeline, plays a cue for each new one and accepts a few line
//! commands (`more`, `reply`, `view`, `quit`) on stdin.
//!
//! ## Key Design Principles:
//! - **Graceful Shutdown**: `tokio-graceful` waits for Ctrl+C, SIGTERM or a
//!   `quit` command, then gives the session tasks ten seconds to stop.
//! - **Logs Go to Files**: the terminal is the timeline, so tracing output is
//!   written only to the rolling JSON files.

mod commands;
mod console;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lib_boostwatch::configs::{ConfigError, Settings, load_config};
use lib_boostwatch::core::{Reconciler, SessionContext, TimelineView, ViewEffect};
use lib_boostwatch::ingestors::{FeedPoller, FeedPushIngestor, TimelineUpdate, derive_ws_url, drive_view};
use lib_boostwatch::loggers::{LogOptions, setup_logging};
use lib_boostwatch::retrieve::{ApiClient, FeedApi, FeedError};
use lib_boostwatch::triggers::{CuePlayer, SilentCuePlayer, TriggerQueue};
use tokio::sync::mpsc::unbounded_channel;
use tokio_graceful::{Shutdown, ShutdownGuard};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::commands::{HELP, spawn_command_loop};
use crate::console::ConsoleTimeline;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let _log_guard = match setup_logging(&LogOptions {
        level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        file_prefix: "boostwatch".to_string(),
        console: false,
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!(base_url = %settings.base_url, view = %settings.view, "boostwatch starting");

    let stop = CancellationToken::new();
    let signal_stop = stop.clone();
    let shutdown = Shutdown::new(async move {
        tokio::select! {
            _ = tokio_graceful::default_signal() => {}
            _ = signal_stop.cancelled() => {}
        }
    });

    let task_stop = stop.clone();
    shutdown.spawn_task_fn(move |guard| async move {
        if let Err(e) = run(settings, task_stop.clone(), guard).await {
            error!("session failed: {:#}", e);
            eprintln!("Error: {:#}", e);
        }
        task_stop.cancel();
    });

    match shutdown.shutdown_with_limit(Duration::from_secs(10)).await {
        Ok(elapsed) => {
            info!(
                "shutdown: gracefully {}s after shutdown signal received",
                elapsed.as_secs_f64()
            );
        }
        Err(e) => {
            info!("shutdown: forcefully due to timeout: {}", e);
        }
    }

    info!("Bye!");
    println!("Bye!");

    Ok(())
}

fn cue_player(settings: &Settings, api: &FeedApi) -> Arc<dyn CuePlayer> {
    #[cfg(feature = "audio")]
    if settings.audio {
        return Arc::new(lib_boostwatch::triggers::RodioCuePlayer::new(
            api.client().raw_client(),
            settings.base_url.clone(),
        ));
    }
    #[cfg(not(feature = "audio"))]
    if settings.audio {
        warn!(base_url = %api.client().base_url(), "audio requested but this build has no audio support; cues are logged only");
    }
    Arc::new(SilentCuePlayer::default())
}

/// Wires one session together and runs it until `stop` fires or the
/// shutdown guard is cancelled.
async fn run(settings: Settings, stop: CancellationToken, guard: ShutdownGuard) -> Result<()> {
    let client = ApiClient::with_options(
        settings.base_url.as_str(),
        settings.auth_token.clone(),
        settings.client.clone(),
    )
    .context("building HTTP client")?;
    let api = FeedApi::new(client);

    let (numerology, apps) = match Reconciler::load_collaborators(&api).await {
        Ok(loaded) => loaded,
        Err(FeedError::Unauthorized) => {
            ConsoleTimeline::new(std::io::stdout()).apply(&ViewEffect::RedirectToLogin);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!(rules = numerology.rules().len(), apps = apps.len(), "collaborators loaded");

    let queue = TriggerQueue::new(cue_player(&settings, &api));
    let session = SessionContext::new(settings.view, settings.session.clone(), numerology, apps);
    let reconciler = Reconciler::new(api, session, queue);

    let (updates, rx) = unbounded_channel::<TimelineUpdate>();
    let mut handles = Vec::new();

    handles.push(reconciler.queue().spawn_scheduler(settings.trigger_tick, stop.clone()));
    handles.extend(
        FeedPoller::new(reconciler.clone(), updates.clone())
            .with_intervals(settings.poll_interval, settings.balance_interval, settings.age_refresh)
            .spawn(stop.clone()),
    );

    if settings.websocket {
        let ws_url = match settings.ws_url.clone() {
            Some(url) => url,
            None => derive_ws_url(&settings.base_url).context("deriving push channel URL")?,
        };
        let ingestor = FeedPushIngestor::new(ws_url, reconciler.clone(), updates.clone());
        let token = stop.clone();
        handles.push(tokio::spawn(async move { ingestor.run(token).await }));
    }

    handles.push(spawn_command_loop(reconciler.clone(), updates.clone(), stop.clone()));
    drop(updates);

    let renderer = tokio::spawn(async move {
        let mut view = ConsoleTimeline::new(std::io::stdout());
        drive_view(rx, &mut view).await;
    });

    println!("Watching {} on {}. {}", settings.view, settings.base_url, HELP);

    tokio::select! {
        _ = guard.cancelled() => info!("Signal received: stopping session"),
        _ = stop.cancelled() => info!("Session stopped"),
    }
    stop.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("session task ended abnormally: {}", e);
        }
    }
    // Every sender is gone now, so the renderer drains and exits.
    if let Err(e) = renderer.await {
        warn!("renderer ended abnormally: {}", e);
    }

    Ok(())
}
