//! # Console Timeline
//!
//! Terminal renderer for session effects. New rows are printed as they
//! arrive; rows that land in the middle or at the old end of the list are
//! marked as such, since a terminal cannot insert above what it already
//! printed.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use colored::Colorize;
use lib_boostwatch::core::{BalanceDisplay, TimelineRow, TimelineView, ViewEffect};
use lib_boostwatch::feed::Placement;

/// Plain text for one row as of `now`.
pub fn format_row(row: &TimelineRow, now: DateTime<Utc>) -> String {
    let mut line = format!("#{} {} sats", row.index, row.sats);
    if row.amount_differs {
        line.push_str(&format!(" ({} received)", row.received_sats));
    }
    if !row.numerology.is_empty() {
        line.push(' ');
        line.push_str(&row.numerology.glyphs);
    }
    if !row.person.is_empty() {
        line.push_str(&format!("  {}", row.person));
    }
    if !row.app.is_empty() {
        line.push_str(&format!(" via {} [{}]", row.app, row.app_icon));
    }
    if !row.podcast.is_empty() {
        line.push_str(&format!("  {}", row.podcast));
        if !row.episode.is_empty() {
            line.push_str(&format!(" / {}", row.episode));
        }
    }
    if let Some(remote) = &row.remote {
        let name = remote.episode.as_deref().or(remote.podcast.as_deref()).unwrap_or_default();
        line.push_str(&format!("  (listening to {})", name));
    }
    line.push_str(&format!("  {}", row.age_label(now)));
    if row.reply_sent {
        line.push_str("  [replied]");
    }
    if !row.message.is_empty() {
        line.push_str(&format!("\n    {}", row.message));
    }
    line
}

/// # Console Timeline
pub struct ConsoleTimeline<W: Write + Send> {
    out: W,
    rows: BTreeMap<u64, TimelineRow>,
}

impl<W: Write + Send> ConsoleTimeline<W> {
    /// Renderer writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: BTreeMap::new(),
        }
    }

    fn print(&mut self, text: impl std::fmt::Display) {
        // Terminal write failures leave nothing useful to do.
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TimelineView for ConsoleTimeline<W> {
    fn apply(&mut self, effect: &ViewEffect) {
        let now = Utc::now();
        match effect {
            ViewEffect::Inserted { row, placement, .. } => {
                let text = format_row(row, now);
                let text = match placement {
                    Placement::Only | Placement::Newest => text.bold().to_string(),
                    Placement::Oldest => format!("{} {}", "(older)".dimmed(), text),
                    Placement::Between => format!("{} {}", "(late)".yellow(), text),
                };
                self.rows.insert(row.index, row.clone());
                self.print(text);
            }
            ViewEffect::ScrollToNewest => {}
            ViewEffect::Celebrate { index } => {
                self.print(format!("🎉 #{} filled a gap", index).magenta());
            }
            ViewEffect::ShowEmptyIndicator { looking_for } => {
                self.print(format!("Nothing here yet, waiting for events from #{}...", looking_for).dimmed());
            }
            ViewEffect::HideEmptyIndicator => {}
            ViewEffect::ShowLoadMore { cursor } => {
                self.print(format!("Older events below #{}: type 'more' to load them.", cursor).dimmed());
            }
            ViewEffect::HideLoadMore => {
                self.print("No older events.".dimmed());
            }
            ViewEffect::IndexUnavailable(raw) => {
                self.print(format!("Current index unavailable: {}", raw).red());
            }
            ViewEffect::Balance(BalanceDisplay::Sats { amount, increased }) => {
                let text = format!("Balance: {} sats", amount);
                if *increased {
                    self.print(format!("{} ⬆", text).green().bold());
                } else {
                    self.print(text.cyan());
                }
            }
            ViewEffect::Balance(BalanceDisplay::Error(reason)) => {
                self.print(format!("Balance error: {}", reason).red());
            }
            ViewEffect::ReplyMarked { index } => {
                if let Some(row) = self.rows.get_mut(index) {
                    row.reply_sent = true;
                }
                self.print(format!("Reply sent for #{}", index).green());
            }
            ViewEffect::ReplyFailed(message) => {
                self.print(format!("Reply failed: {}", message).red());
            }
            ViewEffect::RedirectToLogin => {
                self.print("Authorization denied. Log in to the server and restart.".red().bold());
            }
        }
    }

    fn refresh_ages(&mut self, now: DateTime<Utc>) {
        if let Some(newest) = self.rows.values().next_back() {
            let line = format!("Latest: #{} {}", newest.index, newest.age_label(now));
            self.print(line.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_boostwatch::core::{AppCatalog, FeedView};
    use lib_boostwatch::feed::{ActionType, Anchor, BoostEvent};
    use lib_boostwatch::numerology::NumerologyMatcher;

    fn row(index: u64, message: &str) -> TimelineRow {
        let event = BoostEvent {
            index,
            timestamp: Utc::now().timestamp() - 300,
            value_msat_total: 69_000,
            value_msat: 69_000,
            action: ActionType::Boost,
            sender: "Alice".into(),
            app: "Fountain".into(),
            podcast: "Pod".into(),
            episode: "Ep 1".into(),
            message: message.into(),
            ..Default::default()
        };
        TimelineRow::build(
            &event,
            FeedView::Boosts,
            &NumerologyMatcher::with_defaults(),
            &AppCatalog::default(),
            false,
        )
    }

    #[test]
    fn row_text_has_the_essentials() {
        let text = format_row(&row(5, "hello"), Utc::now());
        assert!(text.starts_with("#5 69 sats 💋"), "{}", text);
        assert!(text.contains("from Alice via Fountain [generic]"));
        assert!(text.contains("Pod / Ep 1"));
        assert!(text.contains("5 minutes ago"));
        assert!(text.ends_with("\n    hello"));
    }

    #[test]
    fn reply_marks_are_remembered() {
        colored::control::set_override(false);
        let mut console = ConsoleTimeline::new(Vec::new());
        console.apply(&ViewEffect::Inserted {
            row: row(9, ""),
            anchor: Anchor::Sole,
            placement: Placement::Only,
            position: 0,
        });
        console.apply(&ViewEffect::ReplyMarked { index: 9 });
        console.refresh_ages(Utc::now());
        let out = String::from_utf8(console.into_inner()).unwrap();
        assert!(out.contains("Reply sent for #9"));
        assert!(out.contains("Latest: #9 5 minutes ago"));
    }
}
