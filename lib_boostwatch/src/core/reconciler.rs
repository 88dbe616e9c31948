//! # Reconciler
//!
//! Turns poll responses into a consistent timeline: decides which page to ask
//! for, filters and merges what comes back, and derives view effects and
//! playback triggers from the resulting insertions.
//!
//! ## Key Design Principles:
//! - **Plan, Fetch, Apply**: a [`PageRequest`] is planned from the session
//!   under the lock, the fetch runs without it, and the result is applied
//!   under the lock again. Overlapping polls may complete in any order; the
//!   store's idempotent merge absorbs the overlap.
//! - **Filter Before Merge**: events of the wrong action class or below the
//!   minimum amount never reach the store.
//! - **Pure Core**: planning and applying are plain functions over
//!   [`SessionContext`], so the whole decision logic is testable without a
//!   server or a runtime.
//! - **Authorization Is Final**: after a 403 every further call fails fast
//!   with [`FeedError::Unauthorized`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::apps::AppCatalog;
use super::balance::BalanceTracker;
use super::session::{
    BACKFILL_PAGE_SIZE, Direction, FORWARD_PAGE_SIZE, FeedView, PageRequest, SessionContext,
};
use super::view::{TimelineRow, ViewEffect};
use crate::feed::{BoostEvent, Placement};
use crate::numerology::NumerologyMatcher;
use crate::retrieve::{FeedApi, FeedError, PageQuery, ReplyRequest};
use crate::triggers::{MidiCue, SoundCue, Trigger, TriggerQueue};

/// What a poll should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Ask for the current index, then prime the view.
    ColdStart,
    /// Newer events above the highest known index.
    Forward,
    /// Older events below the lowest known index.
    Backfill,
}

/// Result of applying one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// Effects for the renderer, in order.
    pub effects: Vec<ViewEffect>,
    /// Triggers to submit, ascending by event index.
    pub triggers: Vec<Trigger>,
    /// Novel events merged.
    pub inserted: usize,
    /// Events removed by the view or amount filter.
    pub dropped: usize,
}

/// Result of one reconciler operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Effects for the renderer, in order.
    pub effects: Vec<ViewEffect>,
    /// Triggers handed to the queue.
    pub triggers_submitted: usize,
    /// Novel events merged.
    pub inserted: usize,
    /// Events filtered out.
    pub dropped: usize,
}

/// Reads a current-index response. Numbers and numeric strings count; the
/// result is only valid when at least 1.
fn parse_index(raw: &Value) -> Option<u64> {
    let index = match raw {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|v| *v >= 1.0).map(|v| v as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    index.filter(|i| *i >= 1)
}

/// Plans the priming fetch from the server's current index.
///
/// A valid index gives a forward fetch anchored at it with playback
/// suppressed. Anything else falls back to a backfill from index 1.
pub fn plan_cold_start(ctx: &mut SessionContext, raw_index: &Value) -> (PageRequest, Vec<ViewEffect>) {
    let mut effects = Vec::new();
    let request = match parse_index(raw_index) {
        Some(index) => {
            ctx.current_index = Some(index);
            PageRequest {
                direction: Direction::Forward,
                query: PageQuery {
                    index,
                    count: FORWARD_PAGE_SIZE,
                    old: false,
                },
                play: false,
                cursor_known: true,
            }
        }
        None => {
            warn!(view = %ctx.view, "current index unusable ({}), backfilling from 1", raw_index);
            ctx.current_index = None;
            ctx.awaiting_first_events = true;
            if !matches!(raw_index, Value::Number(_)) {
                effects.push(ViewEffect::IndexUnavailable(raw_index.to_string()));
            }
            PageRequest {
                direction: Direction::Backfill,
                query: PageQuery {
                    index: 1,
                    count: BACKFILL_PAGE_SIZE,
                    old: true,
                },
                play: false,
                cursor_known: false,
            }
        }
    };
    (request, effects)
}

/// Plans a forward or backfill fetch from the store's cursors.
pub fn plan(ctx: &SessionContext, direction: Direction) -> PageRequest {
    match direction {
        Direction::Forward => {
            let cursor = ctx.store.highest().or(ctx.current_index);
            PageRequest {
                direction,
                query: PageQuery {
                    index: cursor.unwrap_or(1),
                    count: FORWARD_PAGE_SIZE,
                    old: false,
                },
                play: true,
                cursor_known: cursor.is_some(),
            }
        }
        Direction::Backfill => {
            let cursor = ctx.store.lowest().or(ctx.current_index);
            let query = match cursor {
                Some(index) if index >= 1 => PageQuery {
                    index,
                    count: BACKFILL_PAGE_SIZE,
                    old: true,
                },
                _ => PageQuery {
                    index: 1,
                    count: BACKFILL_PAGE_SIZE,
                    old: false,
                },
            };
            PageRequest {
                direction,
                query,
                play: false,
                cursor_known: cursor.is_some(),
            }
        }
    }
}

/// Builds the playback triggers for a new event.
///
/// Each server-prepared effect becomes its own trigger. Without any, the
/// numerology sound cues form one trigger, and failing those the default
/// sound does. Nothing plays while playback is off or in views without
/// effects.
pub fn triggers_for(ctx: &SessionContext, event: &BoostEvent) -> Vec<Trigger> {
    if !ctx.settings.playback || !ctx.view.effects() {
        return Vec::new();
    }

    let mut triggers: Vec<Trigger> = event
        .effects
        .iter()
        .map(|effect| {
            let mut trigger = Trigger::new(event.index);
            if let Some(midi) = &effect.midi {
                trigger = trigger.with_midi(MidiCue::with_fallbacks(
                    midi.note,
                    midi.velocity,
                    midi.channel,
                    midi.duration,
                ));
            }
            if let Some(sound) = effect.sound.as_ref().filter(|s| !s.sound_file.is_empty()) {
                let mut cue = SoundCue::new(sound.sound_file.clone());
                if !sound.sound_name.is_empty() {
                    cue.name = sound.sound_name.clone();
                }
                trigger = trigger.with_sound(cue);
            }
            trigger
        })
        .filter(|trigger| !trigger.is_empty())
        .collect();
    if !triggers.is_empty() {
        return triggers;
    }

    let amount = event.display_sats().max(0) as u64;
    let mut trigger = Trigger::new(event.index);
    for file in ctx.numerology.annotate(amount).sound_files {
        trigger = trigger.with_sound(SoundCue::new(file));
    }
    if trigger.is_empty() {
        if let Some(file) = &ctx.settings.default_sound {
            trigger = trigger.with_sound(SoundCue::new(file.clone()));
        }
    }
    if !trigger.is_empty() {
        triggers.push(trigger);
    }
    triggers
}

/// Filters, merges and interprets one fetched page.
pub fn apply_page(ctx: &mut SessionContext, request: &PageRequest, events: Vec<BoostEvent>) -> Applied {
    let mut applied = Applied::default();
    let page_was_empty = events.is_empty();
    let force_play = ctx.showing_empty || ctx.awaiting_first_events;

    let total = events.len();
    let min_sats = ctx.settings.min_sats;
    let view = ctx.view;
    let mut accepted: Vec<BoostEvent> = events
        .into_iter()
        .filter(|e| view.accepts(e.action) && e.display_sats() >= min_sats)
        .collect();
    applied.dropped = total - accepted.len();
    accepted.sort_by_key(|e| e.index);

    let insertions = ctx.store.merge(accepted);
    applied.inserted = insertions.len();

    let mut scrolled = false;
    for insertion in &insertions {
        let row = TimelineRow::build(
            &insertion.event,
            ctx.view,
            &ctx.numerology,
            &ctx.apps,
            ctx.settings.show_received_sats,
        );
        applied.effects.push(ViewEffect::Inserted {
            row,
            anchor: insertion.anchor,
            placement: insertion.placement,
            position: insertion.position,
        });

        if request.direction == Direction::Backfill {
            continue;
        }
        match insertion.placement {
            Placement::Only | Placement::Newest => {
                if request.play {
                    applied.triggers.extend(triggers_for(ctx, &insertion.event));
                }
                if ctx.at_newest && !scrolled {
                    applied.effects.push(ViewEffect::ScrollToNewest);
                    scrolled = true;
                }
            }
            Placement::Oldest | Placement::Between if ctx.view.effects() => {
                applied.effects.push(ViewEffect::Celebrate {
                    index: insertion.event.index,
                });
            }
            Placement::Oldest | Placement::Between => {}
        }
    }

    // The first events after an empty state always play, to show the feed is live.
    if force_play && applied.triggers.is_empty() {
        if let Some(newest) = insertions.iter().max_by_key(|i| i.event.index) {
            applied.triggers.extend(triggers_for(ctx, &newest.event));
        }
    }

    if !insertions.is_empty() {
        ctx.awaiting_first_events = false;
    }

    if ctx.store.is_empty() {
        if !ctx.showing_empty {
            ctx.showing_empty = true;
            applied.effects.push(ViewEffect::ShowEmptyIndicator {
                looking_for: request.query.index,
            });
        }
    } else if ctx.showing_empty {
        ctx.showing_empty = false;
        applied.effects.push(ViewEffect::HideEmptyIndicator);
    }

    let load_more = match request.direction {
        Direction::Backfill => {
            let more = !page_was_empty && (request.query.index > 1 || !request.cursor_known);
            if more { ctx.store.lowest() } else { None }
        }
        Direction::Forward => match ctx.load_more_cursor {
            Some(_) => ctx.store.lowest(),
            None => ctx.store.lowest().filter(|lowest| *lowest > 1),
        },
    };
    if load_more != ctx.load_more_cursor {
        match load_more {
            Some(cursor) => applied.effects.push(ViewEffect::ShowLoadMore { cursor }),
            None => applied.effects.push(ViewEffect::HideLoadMore),
        }
        ctx.load_more_cursor = load_more;
    }

    applied.triggers.sort_by_key(|t| t.event_index);
    applied
}

/// # Reconciler
///
/// Cheap to clone; clones share one session, queue and balance tracker.
#[derive(Clone)]
pub struct Reconciler {
    api: FeedApi,
    session: Arc<Mutex<SessionContext>>,
    queue: TriggerQueue,
    balance: BalanceTracker,
}

impl Reconciler {
    /// Reconciler over `session`, playing through `queue`.
    pub fn new(api: FeedApi, session: SessionContext, queue: TriggerQueue) -> Self {
        Self {
            api,
            session: Arc::new(Mutex::new(session)),
            queue,
            balance: BalanceTracker::new(),
        }
    }

    /// Loads the numerology rules and app catalog. Neither failure is fatal:
    /// rules fall back to the built-in set, apps to an empty catalog.
    pub async fn load_collaborators(api: &FeedApi) -> Result<(NumerologyMatcher, AppCatalog), FeedError> {
        let numerology = match api.fetch_numerology().await {
            Ok(matcher) => matcher,
            Err(FeedError::Unauthorized) => return Err(FeedError::Unauthorized),
            Err(e) => {
                warn!("numerology rules unavailable, using built-in set: {}", e);
                NumerologyMatcher::with_defaults()
            }
        };
        let apps = match api.fetch_apps().await {
            Ok(raw) => AppCatalog::new(raw),
            Err(FeedError::Unauthorized) => return Err(FeedError::Unauthorized),
            Err(e) => {
                warn!("app catalog unavailable: {}", e);
                AppCatalog::default()
            }
        };
        info!(rules = numerology.rules().len(), apps = apps.len(), "session configuration loaded");
        Ok((numerology, apps))
    }

    /// Shared session state.
    pub fn session(&self) -> Arc<Mutex<SessionContext>> {
        Arc::clone(&self.session)
    }

    /// The playback queue.
    pub fn queue(&self) -> &TriggerQueue {
        &self.queue
    }

    /// The feed API.
    pub fn api(&self) -> &FeedApi {
        &self.api
    }

    async fn ensure_authorized(&self) -> Result<(), FeedError> {
        if self.session.lock().await.authorized {
            Ok(())
        } else {
            Err(FeedError::Unauthorized)
        }
    }

    async fn guard<T>(&self, result: Result<T, FeedError>) -> Result<T, FeedError> {
        if matches!(result, Err(FeedError::Unauthorized)) {
            warn!("authorization denied, stopping session");
            self.session.lock().await.authorized = false;
        }
        result
    }

    /// Runs one poll in `mode`.
    pub async fn poll(&self, mode: PollMode) -> Result<PollOutcome, FeedError> {
        self.ensure_authorized().await?;

        let (view, request, mut effects) = match mode {
            PollMode::ColdStart => {
                let view = self.session.lock().await.view;
                let raw_index = match self.api.fetch_current_index(view.index_path()).await {
                    Ok(raw) => raw,
                    Err(FeedError::Decode(reason)) => Value::String(reason),
                    Err(e) => return self.guard(Err(e)).await,
                };
                let mut ctx = self.session.lock().await;
                let (request, effects) = plan_cold_start(&mut ctx, &raw_index);
                (ctx.view, request, effects)
            }
            PollMode::Forward | PollMode::Backfill => {
                let direction = if mode == PollMode::Forward {
                    Direction::Forward
                } else {
                    Direction::Backfill
                };
                let ctx = self.session.lock().await;
                (ctx.view, plan(&ctx, direction), Vec::new())
            }
        };

        let events = self
            .guard(self.api.fetch_page(view.feed_path(), request.query).await)
            .await?;
        debug!(?mode, received = events.len(), "page fetched");

        let mut outcome = self.apply(view, &request, events).await;
        effects.append(&mut outcome.effects);
        outcome.effects = effects;
        Ok(outcome)
    }

    async fn apply(&self, view: FeedView, request: &PageRequest, events: Vec<BoostEvent>) -> PollOutcome {
        let applied = {
            let mut ctx = self.session.lock().await;
            if ctx.view != view {
                debug!(planned = %view, current = %ctx.view, "discarding page for a previous view");
                return PollOutcome::default();
            }
            apply_page(&mut ctx, request, events)
        };

        let triggers_submitted = applied.triggers.len();
        for trigger in applied.triggers {
            self.queue.submit(trigger);
        }
        if applied.inserted > 0 || applied.dropped > 0 {
            info!(
                inserted = applied.inserted,
                dropped = applied.dropped,
                triggers = triggers_submitted,
                "page applied"
            );
        }
        PollOutcome {
            effects: applied.effects,
            triggers_submitted,
            inserted: applied.inserted,
            dropped: applied.dropped,
        }
    }

    /// One timer tick: cold start while the store is empty, otherwise a
    /// forward poll followed by a balance refresh.
    pub async fn tick(&self) -> Result<PollOutcome, FeedError> {
        let empty = self.session.lock().await.store.is_empty();
        if empty {
            return self.poll(PollMode::ColdStart).await;
        }
        let mut outcome = self.poll(PollMode::Forward).await?;
        if let Some(effect) = self.refresh_balance().await? {
            outcome.effects.push(effect);
        }
        Ok(outcome)
    }

    /// The user asked for older history.
    pub async fn load_more(&self) -> Result<PollOutcome, FeedError> {
        self.poll(PollMode::Backfill).await
    }

    /// Merges events the push channel delivered for `view` exactly like a
    /// forward poll. Frames for any other view are ignored.
    pub async fn ingest_pushed(&self, view: FeedView, events: Vec<BoostEvent>) -> Result<PollOutcome, FeedError> {
        self.ensure_authorized().await?;
        let request = {
            let ctx = self.session.lock().await;
            if ctx.view != view {
                debug!(pushed = %view, current = %ctx.view, "ignoring push frame for another view");
                return Ok(PollOutcome::default());
            }
            plan(&ctx, Direction::Forward)
        };
        Ok(self.apply(view, &request, events).await)
    }

    /// Records a balance pushed by the server.
    pub fn observe_balance(&self, raw: &Value) -> Option<ViewEffect> {
        self.balance.observe(raw)
    }

    /// Polls the balance endpoint.
    pub async fn refresh_balance(&self) -> Result<Option<ViewEffect>, FeedError> {
        self.ensure_authorized().await?;
        match self.balance.refresh(&self.api).await {
            Some(ViewEffect::RedirectToLogin) => self.guard(Err(FeedError::Unauthorized)).await,
            effect => Ok(effect),
        }
    }

    /// Sends a reply and marks the event it was recorded against.
    pub async fn reply(&self, request: ReplyRequest) -> Result<Vec<ViewEffect>, FeedError> {
        self.ensure_authorized().await?;
        let outcome = self.guard(self.api.send_reply(&request).await).await?;
        if !outcome.success {
            let message = outcome.message.unwrap_or_else(|| "reply failed".to_string());
            warn!(index = request.index, "reply rejected: {}", message);
            return Ok(vec![ViewEffect::ReplyFailed(message)]);
        }

        let index = outcome.reply_to_idx.unwrap_or(request.index);
        let marked = self.session.lock().await.store.mark_replied(index);
        info!(index, marked, "reply sent");
        Ok(if marked {
            vec![ViewEffect::ReplyMarked { index }]
        } else {
            Vec::new()
        })
    }

    /// Switches the session to another view and primes it.
    pub async fn switch_view(&self, view: FeedView) -> Result<PollOutcome, FeedError> {
        self.session.lock().await.reset(view);
        info!(%view, "view switched");
        self.poll(PollMode::ColdStart).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{ActionType, Anchor, EventEffect};
    use crate::feed::event::{MidiEffect, SoundEffect};
    use crate::core::session::SessionSettings;
    use crate::triggers::Cue;
    use serde_json::json;

    fn ctx() -> SessionContext {
        SessionContext::new(
            FeedView::Boosts,
            SessionSettings::default(),
            NumerologyMatcher::default(),
            AppCatalog::default(),
        )
    }

    fn boost(index: u64, sats: i64) -> BoostEvent {
        BoostEvent {
            index,
            value_msat: sats * 1000,
            value_msat_total: sats * 1000,
            action: ActionType::Boost,
            ..Default::default()
        }
    }

    fn played(applied: &Applied) -> Vec<u64> {
        applied.triggers.iter().map(|t| t.event_index).collect()
    }

    #[test]
    fn cold_start_with_zero_index_backfills_from_one() {
        let mut ctx = ctx();
        let (request, effects) = plan_cold_start(&mut ctx, &json!(0));
        assert_eq!(request.direction, Direction::Backfill);
        assert_eq!(request.query.index, 1);
        assert!(request.query.old);
        assert!(!request.cursor_known);
        assert!(effects.is_empty());
        assert!(ctx.awaiting_first_events);

        let (_, effects) = plan_cold_start(&mut ctx, &json!("error"));
        assert!(matches!(effects[..], [ViewEffect::IndexUnavailable(_)]));
    }

    #[test]
    fn cold_start_with_valid_index_goes_forward_quietly() {
        let mut ctx = ctx();
        let (request, _) = plan_cold_start(&mut ctx, &json!(42));
        assert_eq!(request.direction, Direction::Forward);
        assert_eq!(request.query, PageQuery { index: 42, count: 20, old: false });
        assert!(!request.play);
        assert_eq!(ctx.current_index, Some(42));
    }

    #[test]
    fn empty_then_first_events_always_play() {
        let mut ctx = ctx();
        let (request, _) = plan_cold_start(&mut ctx, &json!(0));
        let applied = apply_page(&mut ctx, &request, vec![]);
        assert_eq!(applied.effects, vec![ViewEffect::ShowEmptyIndicator { looking_for: 1 }]);

        let request = plan(&ctx, Direction::Backfill);
        assert_eq!(request.query, PageQuery { index: 1, count: 100, old: false });
        let applied = apply_page(&mut ctx, &request, vec![boost(3, 10), boost(4, 10)]);
        assert_eq!(played(&applied), vec![4]);
        assert!(applied.effects.contains(&ViewEffect::HideEmptyIndicator));
        assert!(!ctx.showing_empty);
        assert!(!ctx.awaiting_first_events);
    }

    #[test]
    fn filtered_events_never_reach_the_store() {
        let mut ctx = ctx();
        ctx.settings.min_sats = 50;
        let mut stream = boost(7, 100);
        stream.action = ActionType::Stream;
        let request = plan(&ctx, Direction::Forward);
        let applied = apply_page(&mut ctx, &request, vec![stream, boost(8, 10), boost(9, 100)]);
        assert_eq!(applied.dropped, 2);
        assert!(!ctx.store.contains(7));
        assert!(!ctx.store.contains(8));
        assert!(ctx.store.contains(9));
    }

    #[test]
    fn forward_newest_plays_and_gap_fill_celebrates() {
        let mut ctx = ctx();
        ctx.store.merge(vec![boost(10, 1), boost(20, 1)]);
        let request = plan(&ctx, Direction::Forward);
        assert_eq!(request.query.index, 20);

        let applied = apply_page(&mut ctx, &request, vec![boost(22, 1), boost(15, 1), boost(21, 1)]);
        assert_eq!(played(&applied), vec![21, 22]);
        let scrolls = applied.effects.iter().filter(|e| **e == ViewEffect::ScrollToNewest).count();
        assert_eq!(scrolls, 1);
        assert!(applied.effects.contains(&ViewEffect::Celebrate { index: 15 }));
        assert!(applied.effects.iter().any(|e| matches!(
            e,
            ViewEffect::Inserted { anchor: Anchor::After(10), row, .. } if row.index == 15
        )));
    }

    #[test]
    fn no_autoscroll_when_reader_scrolled_away() {
        let mut ctx = ctx();
        ctx.store.insert(boost(1, 1));
        ctx.at_newest = false;
        let request = plan(&ctx, Direction::Forward);
        let applied = apply_page(&mut ctx, &request, vec![boost(2, 1)]);
        assert!(!applied.effects.contains(&ViewEffect::ScrollToNewest));
        assert_eq!(played(&applied), vec![2]);
    }

    #[test]
    fn backfill_is_silent_and_drives_load_more() {
        let mut ctx = ctx();
        ctx.store.insert(boost(200, 1));
        let request = plan(&ctx, Direction::Backfill);
        assert_eq!(request.query, PageQuery { index: 200, count: 100, old: true });

        let applied = apply_page(&mut ctx, &request, vec![boost(150, 1), boost(199, 1)]);
        assert!(applied.triggers.is_empty());
        assert!(!applied.effects.contains(&ViewEffect::ScrollToNewest));
        assert!(applied.effects.contains(&ViewEffect::ShowLoadMore { cursor: 150 }));

        let request = plan(&ctx, Direction::Backfill);
        let applied = apply_page(&mut ctx, &request, vec![]);
        assert_eq!(applied.effects, vec![ViewEffect::HideLoadMore]);
        assert_eq!(ctx.load_more_cursor, None);
    }

    #[test]
    fn playback_off_means_no_triggers() {
        let mut ctx = ctx();
        ctx.settings.playback = false;
        ctx.store.insert(boost(1, 1));
        let request = plan(&ctx, Direction::Forward);
        let applied = apply_page(&mut ctx, &request, vec![boost(2, 1)]);
        assert!(applied.triggers.is_empty());
    }

    #[test]
    fn each_server_effect_is_its_own_trigger() {
        let ctx = ctx();
        let mut event = boost(5, 1);
        event.effects = vec![
            EventEffect {
                midi: Some(MidiEffect {
                    note: Some(64),
                    velocity: None,
                    channel: None,
                    duration: Some(250),
                }),
                sound: Some(SoundEffect {
                    sound_file: "/sounds/dice.mp3".into(),
                    sound_name: "Dice".into(),
                }),
            },
            EventEffect {
                midi: None,
                sound: Some(SoundEffect {
                    sound_file: "/sounds/coin.mp3".into(),
                    sound_name: String::new(),
                }),
            },
            EventEffect { midi: None, sound: None },
        ];
        let triggers = triggers_for(&ctx, &event);
        assert_eq!(triggers.len(), 2);
        assert!(triggers.iter().all(|t| t.event_index == 5));
        assert_eq!(triggers[0].cues.len(), 2);
        assert!(matches!(&triggers[0].cues[0], Cue::Midi(m) if m.note == 64 && m.velocity == 100));
        assert!(matches!(&triggers[0].cues[1], Cue::Sound(s) if s.name == "Dice"));
        assert!(matches!(&triggers[1].cues[..], [Cue::Sound(s)] if s.file == "/sounds/coin.mp3"));

        let plain = triggers_for(&ctx, &boost(6, 1));
        assert_eq!(plain.len(), 1);
        assert!(matches!(&plain[0].cues[..], [Cue::Sound(s)] if s.file == "/pew.mp3"));
    }

    #[test]
    fn sent_view_neither_plays_nor_celebrates() {
        let mut ctx = ctx();
        ctx.view = FeedView::Sent;
        ctx.store.merge(vec![boost(10, 1), boost(20, 1)]);
        let request = plan(&ctx, Direction::Forward);
        let applied = apply_page(&mut ctx, &request, vec![boost(15, 1), boost(21, 1)]);
        assert_eq!(applied.inserted, 2);
        assert!(applied.triggers.is_empty());
        assert!(!applied.effects.iter().any(|e| matches!(e, ViewEffect::Celebrate { .. })));
        assert!(applied.effects.contains(&ViewEffect::ScrollToNewest));

        let mut empty = SessionContext::new(
            FeedView::Sent,
            SessionSettings::default(),
            NumerologyMatcher::default(),
            AppCatalog::default(),
        );
        let (request, _) = plan_cold_start(&mut empty, &json!(0));
        let applied = apply_page(&mut empty, &request, vec![boost(3, 10)]);
        assert_eq!(applied.inserted, 1);
        assert!(applied.triggers.is_empty());
    }

    #[test]
    fn index_parsing_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_index(&json!(12)), Some(12));
        assert_eq!(parse_index(&json!("12")), Some(12));
        assert_eq!(parse_index(&json!(12.0)), Some(12));
        assert_eq!(parse_index(&json!(0)), None);
        assert_eq!(parse_index(&json!(-3)), None);
        assert_eq!(parse_index(&json!(null)), None);
    }
}
