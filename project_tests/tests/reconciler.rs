//! # Session Reconciliation Tests
//!
//! Drives a [`Reconciler`] against a wiremock feed server: cold start, the
//! empty state, forward polls, authorization loss, replies and view switches.

use std::sync::Arc;
use std::time::Duration;

use lib_boostwatch::core::{
    AppCatalog, BalanceDisplay, FeedView, Reconciler, SessionContext, SessionSettings, ViewEffect,
};
use lib_boostwatch::feed::{ActionType, BoostEvent, Placement};
use lib_boostwatch::ingestors::PushEvent;
use lib_boostwatch::numerology::NumerologyMatcher;
use lib_boostwatch::retrieve::{ApiClient, ClientOptions, FeedApi, FeedError, ReplyRequest};
use lib_boostwatch::triggers::{SilentCuePlayer, TriggerQueue};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> FeedApi {
    let options = ClientOptions {
        timeout: Duration::from_secs(5),
        max_retries: 0,
        ..Default::default()
    };
    FeedApi::new(ApiClient::with_options(&server.uri(), None, options).unwrap())
}

fn reconciler(server: &MockServer, view: FeedView, settings: SessionSettings) -> Reconciler {
    let session = SessionContext::new(
        view,
        settings,
        NumerologyMatcher::with_defaults(),
        AppCatalog::default(),
    );
    let queue = TriggerQueue::new(Arc::new(SilentCuePlayer::new(Duration::ZERO)));
    Reconciler::new(api(server), session, queue)
}

fn event(index: u64, action: u8, sats: i64) -> serde_json::Value {
    json!({
        "index": index,
        "time": 1_700_000_000 + index as i64,
        "action": action,
        "value_msat": sats * 1000,
        "value_msat_total": sats * 1000,
        "sender": format!("listener{}", index),
        "app": "Fountain",
        "podcast": "Pod",
        "episode": "Ep",
        "message": "",
        "tlv": ""
    })
}

fn inserted(effects: &[ViewEffect]) -> Vec<(u64, Placement)> {
    effects
        .iter()
        .filter_map(|e| match e {
            ViewEffect::Inserted { row, placement, .. } => Some((row.index, *placement)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn empty_cold_start_waits_then_plays_the_first_arrival() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boosts"))
        .and(query_param("index", "1"))
        .and(query_param("count", "100"))
        .and(query_param("old", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boosts"))
        .and(query_param("index", "1"))
        .and(query_param("old", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([event(3, 2, 100), event(2, 2, 50)])),
        )
        .mount(&server)
        .await;

    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());

    let first = reconciler.tick().await.unwrap();
    assert_eq!(first.effects, vec![ViewEffect::ShowEmptyIndicator { looking_for: 1 }]);
    assert_eq!(first.triggers_submitted, 0);

    let second = reconciler.tick().await.unwrap();
    assert_eq!(second.inserted, 2);
    assert_eq!(second.triggers_submitted, 1, "first arrival after an empty state plays");
    assert_eq!(inserted(&second.effects).iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 3]);
    assert!(second.effects.contains(&ViewEffect::HideEmptyIndicator));
    assert!(second.effects.contains(&ViewEffect::ShowLoadMore { cursor: 2 }));

    let session = reconciler.session();
    let ctx = session.lock().await;
    assert!(!ctx.showing_empty);
    assert!(!ctx.awaiting_first_events);
    assert_eq!(ctx.store.len(), 2);
}

#[tokio::test]
async fn non_numeric_index_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("offline")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boosts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());
    let outcome = reconciler.tick().await.unwrap();
    assert_eq!(
        outcome.effects,
        vec![
            ViewEffect::IndexUnavailable("\"offline\"".to_string()),
            ViewEffect::ShowEmptyIndicator { looking_for: 1 },
        ]
    );
}

#[tokio::test]
async fn forward_polls_filter_dedupe_and_play_the_newest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("10")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boosts"))
        .and(query_param("index", "10"))
        .and(query_param("count", "20"))
        .and(query_param_is_missing("old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            event(10, 2, 100),
            event(11, 1, 500),
            event(12, 2, 3)
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/boosts"))
        .and(query_param("index", "10"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([event(10, 2, 100), event(13, 2, 21)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(5000)))
        .mount(&server)
        .await;

    let settings = SessionSettings {
        min_sats: 10,
        ..Default::default()
    };
    let reconciler = reconciler(&server, FeedView::Boosts, settings);

    let primed = reconciler.tick().await.unwrap();
    assert_eq!(primed.inserted, 1);
    assert_eq!(primed.dropped, 2, "a stream and a 3 sat boost are filtered out");
    assert_eq!(primed.triggers_submitted, 0, "priming never plays");
    assert_eq!(inserted(&primed.effects), vec![(10, Placement::Only)]);
    assert!(primed.effects.contains(&ViewEffect::ShowLoadMore { cursor: 10 }));

    let next = reconciler.tick().await.unwrap();
    assert_eq!(next.inserted, 1);
    assert_eq!(next.triggers_submitted, 1);
    assert_eq!(inserted(&next.effects), vec![(13, Placement::Newest)]);
    assert!(next.effects.contains(&ViewEffect::ScrollToNewest));
    assert_eq!(
        next.effects.last(),
        Some(&ViewEffect::Balance(BalanceDisplay::Sats {
            amount: 5000,
            increased: false
        }))
    );

    let session = reconciler.session();
    let ctx = session.lock().await;
    assert_eq!(ctx.store.len(), 2);
    assert!(!ctx.store.contains(11));
    assert!(!ctx.store.contains(12));
}

#[tokio::test]
async fn forbidden_stops_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/index"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());
    assert!(matches!(reconciler.tick().await, Err(FeedError::Unauthorized)));
    assert!(!reconciler.session().lock().await.authorized);

    // No further requests once authorization is gone.
    assert!(matches!(reconciler.tick().await, Err(FeedError::Unauthorized)));
    assert!(matches!(reconciler.load_more().await, Err(FeedError::Unauthorized)));
}

#[tokio::test]
async fn reply_marks_the_recorded_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reply"))
        .and(body_string_contains("index=7"))
        .and(body_string_contains("sats=100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"index": 99, "payment_info": {"reply_to_idx": 7}}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "no route"
        })))
        .mount(&server)
        .await;

    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());
    let pushed: BoostEvent = serde_json::from_value(event(7, 2, 100)).unwrap();
    assert_eq!(pushed.action, ActionType::Boost);
    let ingested = reconciler.ingest_pushed(FeedView::Boosts, vec![pushed]).await.unwrap();
    assert_eq!(ingested.inserted, 1);

    let request = ReplyRequest {
        index: 7,
        sats: 100,
        sender: None,
        message: Some("thanks".into()),
    };
    let effects = reconciler.reply(request.clone()).await.unwrap();
    assert_eq!(effects, vec![ViewEffect::ReplyMarked { index: 7 }]);
    {
        let session = reconciler.session();
        let ctx = session.lock().await;
        assert!(ctx.store.get(7).is_some_and(|e| e.reply_sent));
    }

    let effects = reconciler.reply(request).await.unwrap();
    assert_eq!(effects, vec![ViewEffect::ReplyFailed("no route".into())]);
}

#[tokio::test]
async fn switching_views_starts_over() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sent_index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sent"))
        .and(query_param("index", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([event(5, 2, 42)])))
        .mount(&server)
        .await;

    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());
    let pushed: BoostEvent = serde_json::from_value(event(30, 2, 100)).unwrap();
    reconciler.ingest_pushed(FeedView::Boosts, vec![pushed]).await.unwrap();

    let outcome = reconciler.switch_view(FeedView::Sent).await.unwrap();
    assert_eq!(inserted(&outcome.effects), vec![(5, Placement::Only)]);

    let session = reconciler.session();
    let ctx = session.lock().await;
    assert_eq!(ctx.view, FeedView::Sent);
    assert_eq!(ctx.store.len(), 1);
    assert!(ctx.store.contains(5));
}

#[tokio::test]
async fn pushed_frames_only_reach_their_own_view() {
    let server = MockServer::start().await;
    let reconciler = reconciler(&server, FeedView::Boosts, SessionSettings::default());

    let sent = PushEvent::parse(&json!(["payment", event(40, 2, 100)]).to_string());
    let Some(PushEvent::Payment { view, event: pushed }) = sent else {
        panic!("payment frame not recognized: {:?}", sent);
    };
    assert_eq!(view, FeedView::Sent);
    let ignored = reconciler.ingest_pushed(view, vec![pushed]).await.unwrap();
    assert_eq!(ignored.inserted, 0);
    assert_eq!(ignored.triggers_submitted, 0);
    assert!(ignored.effects.is_empty());

    let received = PushEvent::parse(&json!(["boost", event(41, 2, 100)]).to_string());
    let Some(PushEvent::Payment { view, event: pushed }) = received else {
        panic!("boost frame not recognized: {:?}", received);
    };
    let ingested = reconciler.ingest_pushed(view, vec![pushed]).await.unwrap();
    assert_eq!(ingested.inserted, 1);

    let session = reconciler.session();
    let ctx = session.lock().await;
    assert!(!ctx.store.contains(40));
    assert!(ctx.store.contains(41));
}

#[tokio::test]
async fn collaborators_fall_back_but_forbidden_does_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apps.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Fountain": {"icon": "fountain", "url": "https://fountain.fm"}
        })))
        .mount(&server)
        .await;

    let (numerology, apps) = Reconciler::load_collaborators(&api(&server)).await.unwrap();
    assert_eq!(numerology.rules().len(), NumerologyMatcher::with_defaults().rules().len());
    assert_eq!(apps.lookup("fountain").icon, "fountain");

    let locked = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/numerology.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&locked)
        .await;
    assert!(matches!(
        Reconciler::load_collaborators(&api(&locked)).await,
        Err(FeedError::Unauthorized)
    ));
}
