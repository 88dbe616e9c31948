//! # Console Commands
//!
//! Line commands typed while the timeline runs. Stdin is read on a dedicated
//! thread; tokio's stdin would keep the runtime from shutting down while a
//! read is pending.

use std::io::BufRead;
use std::thread;

use lib_boostwatch::core::{FeedView, Reconciler};
use lib_boostwatch::ingestors::{TimelineUpdate, forward_outcome};
use lib_boostwatch::retrieve::ReplyRequest;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Help text for `help`.
pub const HELP: &str = "commands: more | reply <index> <sats> [message] | view <boosts|streams|sent> | quit";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load older events.
    More,
    /// Reply to an event.
    Reply {
        /// Event index.
        index: u64,
        /// Amount to send.
        sats: u64,
        /// Optional text.
        message: Option<String>,
    },
    /// Switch feeds.
    View(FeedView),
    /// Print the command list.
    Help,
    /// Stop the watcher.
    Quit,
}

impl Command {
    /// Parses one line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| "empty command".to_string())?;
        match name.to_ascii_lowercase().as_str() {
            "more" | "m" => Ok(Command::More),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "view" => words
                .next()
                .ok_or_else(|| "usage: view <boosts|streams|sent>".to_string())?
                .parse()
                .map(Command::View),
            "reply" => {
                let usage = || "usage: reply <index> <sats> [message]".to_string();
                let index = words.next().and_then(|w| w.parse::<u64>().ok()).ok_or_else(usage)?;
                let sats = words
                    .next()
                    .and_then(|w| w.parse::<u64>().ok())
                    .filter(|s| *s > 0)
                    .ok_or_else(usage)?;
                let message = words.collect::<Vec<_>>().join(" ");
                Ok(Command::Reply {
                    index,
                    sats,
                    message: (!message.is_empty()).then_some(message),
                })
            }
            other => Err(format!("unknown command '{}'. {}", other, HELP)),
        }
    }
}

/// Spawns the stdin reader thread and the task executing its commands.
pub fn spawn_command_loop(
    reconciler: Reconciler,
    updates: UnboundedSender<TimelineUpdate>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let (line_tx, mut line_rx) = unbounded_channel::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = line_rx.recv() => match line {
                    Some(line) => line,
                    None => break,
                },
            };
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => {
                    info!("quit requested");
                    cancel.cancel();
                    break;
                }
                Ok(command) => execute(command, &reconciler, &updates, &cancel).await,
                Err(message) => println!("{}", message),
            }
        }
    })
}

async fn execute(
    command: Command,
    reconciler: &Reconciler,
    updates: &UnboundedSender<TimelineUpdate>,
    cancel: &CancellationToken,
) {
    match command {
        Command::More => {
            let result = reconciler.load_more().await;
            forward_outcome("load more", result, updates, cancel);
        }
        Command::View(view) => {
            let result = reconciler.switch_view(view).await;
            forward_outcome("view switch", result, updates, cancel);
        }
        Command::Reply { index, sats, message } => {
            let request = ReplyRequest {
                index,
                sats,
                sender: None,
                message,
            };
            match reconciler.reply(request).await {
                Ok(effects) => {
                    for effect in effects {
                        let _ = updates.send(TimelineUpdate::Effect(effect));
                    }
                }
                Err(e) => {
                    warn!(index, "reply failed: {}", e);
                    forward_outcome("reply", Err(e), updates, cancel);
                }
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => cancel.cancel(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("more"), Ok(Command::More));
        assert_eq!(Command::parse(" QUIT "), Ok(Command::Quit));
        assert_eq!(Command::parse("view streams"), Ok(Command::View(FeedView::Streams)));
        assert_eq!(
            Command::parse("reply 42 100 thanks for the show"),
            Ok(Command::Reply {
                index: 42,
                sats: 100,
                message: Some("thanks for the show".into())
            })
        );
        assert_eq!(
            Command::parse("reply 42 100"),
            Ok(Command::Reply {
                index: 42,
                sats: 100,
                message: None
            })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Command::parse("reply x 100").is_err());
        assert!(Command::parse("reply 42 0").is_err());
        assert!(Command::parse("view podcasts").is_err());
        assert!(Command::parse("dance").is_err());
        assert!(Command::parse("   ").is_err());
    }
}
