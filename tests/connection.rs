//! Feed connection against a local WebSocket server: open, requests,
//! dispatch, heartbeat, reconnect, stop and rejected handshakes.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ant_feed::error::FeedError;
use ant_feed::option_chain::OptionChain;
use ant_feed::provider::{StaticToken, TokenProvider};
use ant_feed::types::{FeedMode, Instrument};
use ant_feed::ws::connection::{ConnectionConfig, ConnectionState, FeedConnection, FeedRequest, feed_url};
use ant_feed::ws::subscription::SubscriptionTracker;
use serde_json::json;

use support::{COMPACT_52242, MockFeed, WAIT, compact_frame, eventually};

struct Harness {
    conn: FeedConnection<StaticToken>,
    tokens: Arc<StaticToken>,
    chain: Arc<OptionChain>,
    subscriptions: Arc<SubscriptionTracker>,
}

fn harness(url: &str) -> Harness {
    let config = ConnectionConfig {
        url: url.to_owned(),
        reconnect_delay: Duration::from_millis(50),
        ..ConnectionConfig::default()
    };
    harness_with(config)
}

fn harness_with(config: ConnectionConfig) -> Harness {
    let tokens = Arc::new(StaticToken::new("test-token"));
    let chain = Arc::new(OptionChain::new());
    let subscriptions = Arc::new(SubscriptionTracker::new());
    let conn = FeedConnection::new(
        config,
        Arc::clone(&tokens),
        Arc::clone(&chain),
        Arc::clone(&subscriptions),
    );
    Harness {
        conn,
        tokens,
        chain,
        subscriptions,
    }
}

fn option_52242() -> Instrument {
    Instrument::spot("BANKNIFTY JUL 34800.0 CE", 52_242, 2)
}

// ===================================================================
// Requests
// ===================================================================

#[test]
fn control_envelopes_serialize_to_wire_shape() {
    let sub = FeedRequest::subscribe(FeedMode::CompactMarketData, vec![(2, 52_242), (1, 26_000)]);
    assert_eq!(
        serde_json::to_value(&sub).unwrap(),
        json!({"a": "subscribe", "v": [[2, 52242], [1, 26000]], "m": "compact_marketdata"})
    );

    let unsub = FeedRequest::unsubscribe(FeedMode::MarketData, vec![(2, 1)]);
    assert_eq!(
        serde_json::to_value(&unsub).unwrap(),
        json!({"a": "unsubscribe", "v": [[2, 1]], "m": "marketdata"})
    );

    assert_eq!(
        serde_json::to_string(&FeedRequest::heartbeat()).unwrap(),
        r#"{"a":"h","v":[],"m":""}"#
    );
}

#[test]
fn feed_url_carries_the_token() {
    let url = feed_url("wss://example.com/hydrasocket/v2/websocket", "abc").unwrap();
    assert_eq!(url.query(), Some("access_token=abc"));
    assert!(matches!(feed_url("not a url", "abc"), Err(FeedError::Url(_))));
}

#[tokio::test]
async fn send_before_open_is_dropped() {
    let h = harness("ws://127.0.0.1:9/feed");
    assert_eq!(h.conn.state(), ConnectionState::Disconnected);
    let req = FeedRequest::subscribe(FeedMode::CompactMarketData, vec![(2, 1)]);
    assert!(!h.conn.send(&req).await);
}

// ===================================================================
// Session
// ===================================================================

#[tokio::test]
async fn opens_with_token_and_delivers_requests() {
    let mut server = MockFeed::start().await;
    let h = harness(&server.url);

    h.conn.start(true).await.unwrap();
    h.conn.wait_until_open_timeout(WAIT).await.unwrap();
    assert!(h.conn.is_connected());

    let mut session = server.next_session().await;
    assert!(session.uri.contains("access_token=test-token"), "{}", session.uri);

    let req = FeedRequest::subscribe(FeedMode::CompactMarketData, vec![(2, 52_242)]);
    assert!(h.conn.send(&req).await);
    assert_eq!(
        session.next_json().await,
        json!({"a": "subscribe", "v": [[2, 52242]], "m": "compact_marketdata"})
    );

    h.conn.stop().await;
}

#[tokio::test]
async fn start_twice_is_rejected() {
    let server = MockFeed::start().await;
    let h = harness(&server.url);
    h.conn.start(true).await.unwrap();
    assert!(matches!(
        h.conn.start(true).await,
        Err(FeedError::InvalidArgument(_))
    ));
    h.conn.stop().await;
}

#[tokio::test]
async fn ticks_reach_the_chain_only_for_subscribed_codes() {
    let mut server = MockFeed::start().await;
    let h = harness(&server.url);
    h.subscriptions.subscribe([&option_52242()]);

    h.conn.start(true).await.unwrap();
    let mut session = server.next_session().await;
    // tracked instruments are sent as soon as the session opens
    assert_eq!(
        session.next_json().await,
        json!({"a": "subscribe", "v": [[2, 52242]], "m": "compact_marketdata"})
    );

    session.send_binary(compact_frame(999)).await;
    session.send_binary(vec![0xEE, 0x01]).await;
    session.send_binary(COMPACT_52242.to_vec()).await;

    assert!(eventually(|| h.chain.contains(52_242)).await);
    assert!(!h.chain.contains(999));
    assert!((h.chain.get_by_code(52_242).unwrap().ltp().value() - 451.0).abs() < 1e-9);
    assert!(h.conn.is_connected(), "malformed frames must not drop the session");

    h.conn.stop().await;
}

#[tokio::test]
async fn heartbeat_pings_carry_the_heartbeat_envelope() {
    let mut server = MockFeed::start().await;
    let h = harness_with(ConnectionConfig {
        url: server.url.clone(),
        heartbeat_interval: Duration::from_millis(50),
        ..ConnectionConfig::default()
    });

    h.conn.start(true).await.unwrap();
    h.conn.send_heartbeat();
    h.conn.send_heartbeat();
    let mut session = server.next_session().await;

    let payload = session.next_ping().await;
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&payload).unwrap(),
        json!({"a": "h", "v": [], "m": ""})
    );

    h.conn.stop().await;
}

// ===================================================================
// Reconnect
// ===================================================================

#[tokio::test]
async fn reconnects_and_resubscribes_after_server_drop() {
    let mut server = MockFeed::start().await;
    let h = harness(&server.url);
    h.subscriptions.subscribe([&option_52242()]);

    h.conn.start(true).await.unwrap();
    let mut first = server.next_session().await;
    first.next_json().await;
    assert_eq!(h.conn.reconnect_count(), 0);

    let mut states = h.conn.state_changes();
    states.borrow_and_update();
    let transitions = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state == ConnectionState::Open {
                break;
            }
        }
        seen
    });

    drop(first);

    let mut second = server.next_session().await;
    assert_eq!(
        second.next_json().await,
        json!({"a": "subscribe", "v": [[2, 52242]], "m": "compact_marketdata"})
    );
    assert!(eventually(|| h.conn.reconnect_count() == 1).await);
    let seen = tokio::time::timeout(WAIT, transitions)
        .await
        .expect("state transitions")
        .unwrap();
    assert_eq!(
        seen,
        vec![
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Open,
        ]
    );

    second.send_binary(COMPACT_52242.to_vec()).await;
    assert!(eventually(|| h.chain.contains(52_242)).await);

    h.conn.stop().await;
}

#[tokio::test]
async fn unsubscribe_during_resubscribe_leaves_nothing_subscribed_on_the_wire() {
    let mut server = MockFeed::start().await;
    let h = harness(&server.url);
    let instruments: Vec<Instrument> = (0..250u32)
        .map(|i| Instrument::spot(format!("BANKNIFTY JUL {i}.0 CE"), 100_000 + i, 2))
        .collect();

    h.conn.start(true).await.unwrap();
    h.conn.wait_until_open_timeout(WAIT).await.unwrap();
    let mut first = server.next_session().await;
    assert_eq!(h.conn.subscribe(&instruments).await, 250);
    assert_eq!(first.next_json().await["v"].as_array().unwrap().len(), 250);

    let conn = h.conn.clone();
    let mut states = h.conn.state_changes();
    let remover = tokio::spawn(async move {
        assert!(states.wait_for(|s| *s == ConnectionState::Disconnected).await.is_ok());
        assert!(states.wait_for(|s| *s == ConnectionState::Open).await.is_ok());
        conn.unsubscribe(&instruments).await
    });

    drop(first);
    let mut second = server.next_session().await;
    assert_eq!(remover.await.unwrap(), 250);

    // Replay the requests in wire order.
    let mut on_wire = std::collections::HashSet::new();
    for request in second.drain_json(Duration::from_millis(300)).await {
        for pair in request["v"].as_array().unwrap() {
            let code = pair[1].as_u64().unwrap();
            match request["a"].as_str().unwrap() {
                "subscribe" => on_wire.insert(code),
                "unsubscribe" => on_wire.remove(&code),
                other => panic!("unexpected action {other}"),
            };
        }
    }
    assert!(on_wire.is_empty(), "{} codes left subscribed", on_wire.len());
    assert!(h.subscriptions.is_empty());

    h.conn.stop().await;
}

#[tokio::test]
async fn keeps_retrying_while_server_is_down() {
    // Bind and release a port so that nothing listens on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/feed", listener.local_addr().unwrap());
    drop(listener);

    let h = harness(&url);
    let mut states = h.conn.state_changes();
    h.conn.start(true).await.unwrap();
    states.changed().await.unwrap();

    assert!(matches!(
        h.conn.wait_until_open_timeout(Duration::from_millis(300)).await,
        Err(FeedError::OpenTimeout(_))
    ));
    assert!(matches!(
        h.conn.state(),
        ConnectionState::Connecting | ConnectionState::Disconnected
    ));

    h.conn.stop().await;
    assert_eq!(h.conn.state(), ConnectionState::Closing);
}

// ===================================================================
// Stop and auth
// ===================================================================

#[tokio::test]
async fn stop_is_terminal() {
    let mut server = MockFeed::start().await;
    let h = harness(&server.url);
    h.conn.start(true).await.unwrap();
    h.conn.wait_until_open_timeout(WAIT).await.unwrap();
    let _session = server.next_session().await;

    h.conn.stop().await;

    assert_eq!(h.conn.state(), ConnectionState::Closing);
    assert!(!h.conn.is_connected());
    assert!(matches!(h.conn.wait_until_open().await, Err(FeedError::Closed)));
    assert!(matches!(h.conn.start(true).await, Err(FeedError::Closed)));
    let req = FeedRequest::subscribe(FeedMode::CompactMarketData, vec![(2, 1)]);
    assert!(!h.conn.send(&req).await);

    // no reconnect after stop
    let attempts = server.attempts.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        server.attempts.load(Ordering::SeqCst),
        attempts
    );
}

/// Token provider that counts rejections.
#[derive(Default)]
struct CountingToken {
    invalidations: AtomicUsize,
}

impl TokenProvider for CountingToken {
    async fn current_token(&self) -> ant_feed::error::Result<String> {
        Ok("test-token".into())
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn rejected_handshake_invalidates_and_keeps_retrying() {
    let server = MockFeed::rejecting(401).await;
    let tokens = Arc::new(CountingToken::default());
    let conn = FeedConnection::new(
        ConnectionConfig {
            url: server.url.clone(),
            reconnect_delay: Duration::from_millis(50),
            ..ConnectionConfig::default()
        },
        Arc::clone(&tokens),
        Arc::new(OptionChain::new()),
        Arc::new(SubscriptionTracker::new()),
    );
    conn.start(true).await.unwrap();

    assert!(eventually(|| server.attempts.load(Ordering::SeqCst) >= 3).await);
    assert!(tokens.invalidations.load(Ordering::SeqCst) >= 2);
    assert_ne!(conn.state(), ConnectionState::Open);

    conn.stop().await;
}

#[tokio::test]
async fn static_token_recovers_after_a_rejected_handshake() {
    let mut server = MockFeed::rejecting_first(403, 1).await;
    let h = harness(&server.url);
    h.conn.start(true).await.unwrap();

    h.conn.wait_until_open_timeout(WAIT).await.unwrap();
    assert_eq!(server.attempts.load(Ordering::SeqCst), 2);
    let session = server.next_session().await;
    assert!(session.uri.contains("access_token=test-token"), "{}", session.uri);
    assert_eq!(h.tokens.current_token().await.unwrap(), "test-token");

    h.conn.stop().await;
}
