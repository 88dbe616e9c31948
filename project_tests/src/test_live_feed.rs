//! # Live Feed Runner
//!
//! Primes one session against a running feed server and prints what the
//! timeline would show: the priming page, one backfill and the balance.
//! Cues are logged, not played.
//!
//! ```text
//! cargo run -p project_tests --bin test_live_feed -- --base-url http://127.0.0.1:2112/ --view boosts
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use lib_boostwatch::core::{FeedView, PollOutcome, Reconciler, SessionContext, SessionSettings, ViewEffect};
use lib_boostwatch::loggers::{LogOptions, setup_logging};
use lib_boostwatch::retrieve::{ApiClient, ClientOptions, FeedApi};
use lib_boostwatch::triggers::{SilentCuePlayer, TriggerQueue};
use tracing::info;
use url::Url;

/// Command line for the runner.
#[derive(Parser, Debug)]
struct Args {
    /// Feed server base URL.
    #[arg(long, default_value = "http://127.0.0.1:2112/")]
    base_url: Url,
    /// Feed to prime.
    #[arg(long, default_value = "boosts")]
    view: FeedView,
    /// Bearer token, if the server wants one.
    #[arg(long, env = "BOOSTWATCH_AUTH_TOKEN")]
    auth_token: Option<String>,
}

fn print_outcome(label: &str, outcome: &PollOutcome) {
    println!(
        "\n[{}] inserted={} dropped={} triggers={}",
        label, outcome.inserted, outcome.dropped, outcome.triggers_submitted
    );
    let now = Utc::now();
    for effect in &outcome.effects {
        match effect {
            ViewEffect::Inserted { row, placement, .. } => {
                println!(
                    "  #{:<6} {:>8} sats {:<6} {:<24} {} ({:?})",
                    row.index,
                    row.sats,
                    row.numerology.glyphs,
                    row.person,
                    row.age_label(now),
                    placement
                );
            }
            other => println!("  {:?}", other),
        }
    }
}

#[tokio::main]
/// # Main Test Function
///
/// 1. Loads rules and app catalog.
/// 2. Runs a cold start, then one backfill.
/// 3. Reads the balance.
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = setup_logging(&LogOptions {
        file_prefix: "test_live_feed".to_string(),
        ..Default::default()
    })?;

    let client = ApiClient::with_options(args.base_url.as_str(), args.auth_token, ClientOptions::default())?;
    let api = FeedApi::new(client);

    println!("--- Priming {} from {} ---", args.view, args.base_url);
    let (numerology, apps) = Reconciler::load_collaborators(&api).await?;
    info!(rules = numerology.rules().len(), apps = apps.len(), "collaborators loaded");

    let queue = TriggerQueue::new(Arc::new(SilentCuePlayer::default()));
    let session = SessionContext::new(args.view, SessionSettings::default(), numerology, apps);
    let reconciler = Reconciler::new(api, session, queue);

    let primed = reconciler.tick().await?;
    print_outcome("cold start", &primed);

    let older = reconciler.load_more().await?;
    print_outcome("load more", &older);

    match reconciler.refresh_balance().await? {
        Some(effect) => println!("\n[balance] {:?}", effect),
        None => println!("\n[balance] unavailable"),
    }

    let stored = reconciler.session().lock().await.store.len();
    println!("\n✅ {} events in the timeline", stored);
    Ok(())
}
