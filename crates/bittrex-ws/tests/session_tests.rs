//! Session supervisor tests against the in-memory transport
//!
//! Run with: cargo test -p bittrex-ws --test session_tests

mod common;

use bittrex_auth::Credentials;
use bittrex_types::{BittrexError, OrderChangeType};
use bittrex_ws::{
    encode_payload, AuthState, MarketFeed, MockTransport, RetryPolicy, SessionEnd, SessionPlan,
    SessionState, SessionSupervisor, StreamClient, StreamEvent, Subscription, Transport,
};
use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn btc_eth() -> MarketFeed {
    MarketFeed::new("BTC-ETH".parse().unwrap())
}

struct Running {
    supervisor: Arc<SessionSupervisor>,
    events: mpsc::Receiver<StreamEvent>,
    stop: CancellationToken,
    task: JoinHandle<Result<SessionEnd, BittrexError>>,
}

fn start(config: bittrex_ws::StreamConfig, plan: SessionPlan, transport: Arc<dyn Transport>) -> Running {
    let supervisor = Arc::new(SessionSupervisor::with_transport(config, plan, transport).unwrap());
    let (tx, events) = mpsc::channel(16);
    let stop = CancellationToken::new();
    let task = tokio::spawn({
        let supervisor = supervisor.clone();
        let stop = stop.clone();
        async move { supervisor.run(tx, stop).await }
    });
    Running {
        supervisor,
        events,
        stop,
        task,
    }
}

async fn next_event(events: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no event delivered")
        .expect("event channel closed")
}

async fn finish(task: JoinHandle<Result<SessionEnd, BittrexError>>) -> Result<SessionEnd, BittrexError> {
    timeout(Duration::from_secs(2), task)
        .await
        .expect("session did not finish")
        .expect("session task panicked")
}

#[tokio::test]
async fn test_market_session_streams_ticker_until_stopped() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let mut session = start(market_config(), SessionPlan::Market(btc_eth()), Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    assert_eq!(peer.hubs(), [HUB.to_string()]);

    let channels = accept_subscribe(&mut peer).await;
    assert_eq!(channels, vec!["ticker_BTC-ETH", "orderbook_BTC-ETH_25"]);

    assert!(peer.push_json(HUB, "ticker", TICKER_JSON));
    match next_event(&mut session.events).await {
        StreamEvent::Ticker(ticker) => {
            assert_eq!(ticker.symbol, "BTC-ETH");
            assert_eq!(ticker.last_trade_rate.to_string(), "0.02500000");
        }
        other => panic!("expected ticker, got {:?}", other),
    }

    let supervisor = session.supervisor.clone();
    assert!(eventually(|| supervisor.state() == SessionState::Streaming).await);
    assert_eq!(supervisor.auth_state(), AuthState::Unauthenticated);
    assert!(supervisor
        .subscriptions()
        .is_subscribed(&Subscription::Ticker("BTC-ETH".parse().unwrap())));

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
    assert_eq!(supervisor.state(), SessionState::Closed);
    assert!(supervisor.subscriptions().is_empty());

    // Client closed its half of the socket
    let closed = timeout(Duration::from_secs(2), peer.next_frame()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_order_session_authenticates_before_subscribing() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let mut session = start(order_config(), SessionPlan::Orders, Arc::new(transport));

    let mut peer = accept(&mut peers).await;

    let auth = expect_call(&mut peer, "Authenticate").await;
    assert_eq!(auth.args.len(), 4);
    assert_eq!(auth.args[0], json!("test-key"));
    let timestamp = auth.args[1].as_u64().expect("timestamp is a number");
    let nonce = auth.args[2].as_str().expect("nonce is a string");
    let signature = auth.args[3].as_str().expect("signature is a string");

    let credentials = Credentials::new("test-key", "test-secret").unwrap();
    assert_eq!(signature, credentials.sign(&format!("{}{}", timestamp, nonce)));
    assert_eq!(signature.len(), 128);
    peer.reply(auth.id, Value::Null);

    let check = expect_call(&mut peer, "IsAuthenticated").await;
    assert!(check.args.is_empty());
    peer.reply(check.id, json!(true));

    let channels = accept_subscribe(&mut peer).await;
    assert_eq!(channels, vec!["heartbeat", "order"]);

    peer.push(HUB, "heartbeat", Vec::new());
    assert!(peer.push_json(HUB, "order", ORDER_JSON));

    match next_event(&mut session.events).await {
        StreamEvent::Order(update) => {
            assert_eq!(update.sequence, 12);
            assert_eq!(update.change_type, OrderChangeType::Fill);
            assert_eq!(update.delta.market_symbol, "ETH-BTC");
        }
        other => panic!("expected order update, got {:?}", other),
    }

    let supervisor = session.supervisor.clone();
    assert_eq!(supervisor.auth_state(), AuthState::Authenticated);
    assert!(eventually(|| supervisor.stats().snapshot().heartbeats == 1).await);

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_rejected_authentication_ends_session() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let session = start(order_config(), SessionPlan::Orders, Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    let auth = expect_call(&mut peer, "Authenticate").await;
    peer.reply(auth.id, json!(false));

    let err = finish(session.task).await.unwrap_err();
    assert!(matches!(err, BittrexError::AuthenticationFailed { .. }), "{:?}", err);
    assert_eq!(session.supervisor.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_subscription_rejection_carries_error_code() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let session = start(market_config(), SessionPlan::Market(btc_eth()), Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    let call = expect_call(&mut peer, "Subscribe").await;
    peer.reply(
        call.id,
        json!([
            { "Success": true, "ErrorCode": null },
            { "Success": false, "ErrorCode": "MARKET_DOES_NOT_EXIST" },
        ]),
    );

    let err = finish(session.task).await.unwrap_err();
    assert_eq!(err.subscription_code(), Some("MARKET_DOES_NOT_EXIST"));
    assert_eq!(session.supervisor.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_server_disconnect_ends_session() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let session = start(market_config(), SessionPlan::Market(btc_eth()), Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    accept_subscribe(&mut peer).await;
    let supervisor = session.supervisor.clone();
    assert!(eventually(|| supervisor.state() == SessionState::Streaming).await);

    peer.disconnect();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Disconnected);
    assert_eq!(supervisor.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_expiry_notice_triggers_reauthentication() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let config = order_config().with_reauth_interval(Duration::from_secs(3600));
    let session = start(config, SessionPlan::Orders, Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    let auth = expect_call(&mut peer, "Authenticate").await;
    peer.reply(auth.id, Value::Null);
    let check = expect_call(&mut peer, "IsAuthenticated").await;
    peer.reply(check.id, json!(true));
    accept_subscribe(&mut peer).await;

    peer.push(HUB, "authenticationExpiring", Vec::new());

    let again = expect_call(&mut peer, "Authenticate").await;
    assert_ne!(again.args[2], auth.args[2], "each challenge uses a fresh nonce");
    peer.reply(again.id, Value::Null);

    let supervisor = session.supervisor.clone();
    assert!(eventually(|| {
        supervisor.auth_state() == AuthState::Authenticated
            && supervisor.state() == SessionState::Streaming
    })
    .await);

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_periodic_reauthentication() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let config = order_config().with_reauth_interval(Duration::from_millis(100));
    let session = start(config, SessionPlan::Orders, Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    let auth = expect_call(&mut peer, "Authenticate").await;
    peer.reply(auth.id, Value::Null);
    let check = expect_call(&mut peer, "IsAuthenticated").await;
    peer.reply(check.id, json!(true));
    accept_subscribe(&mut peer).await;

    let again = expect_call(&mut peer, "Authenticate").await;
    peer.reply(again.id, Value::Null);

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_stop_before_connect_completes() {
    init_tracing();
    let (transport, _peers) = MockTransport::new();
    let transport = transport.with_open_delay(Duration::from_secs(5));
    let session = start(market_config(), SessionPlan::Market(btc_eth()), Arc::new(transport));

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
    assert_eq!(session.supervisor.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_connect_timeout_without_retry() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let transport = transport.with_stalled_handshake();
    let config = market_config().with_market_connect_timeout(Duration::from_millis(50));
    let session = start(config, SessionPlan::Market(btc_eth()), Arc::new(transport));

    let err = finish(session.task).await.unwrap_err();
    assert!(matches!(err, BittrexError::ConnectionTimeout { .. }), "{:?}", err);

    // The half-open socket is torn down rather than leaked
    let mut half_open = accept(&mut peers).await;
    let closed = timeout(Duration::from_secs(2), half_open.next_frame()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn test_connect_retries_until_success() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let transport = Arc::new(transport.with_failed_opens(2));
    let config = market_config().with_retry(
        RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(10))
            .with_jitter(0.0)
            .with_max_retries(3),
    );
    let session = start(config, SessionPlan::Market(btc_eth()), transport.clone());

    let mut peer = accept(&mut peers).await;
    accept_subscribe(&mut peer).await;
    assert_eq!(transport.open_attempts(), 3);

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_connect_gives_up_after_max_retries() {
    init_tracing();
    let (transport, _peers) = MockTransport::new();
    let transport = Arc::new(transport.with_failed_opens(10));
    let config = market_config().with_retry(
        RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(5))
            .with_jitter(0.0)
            .with_max_retries(2),
    );
    let session = start(config, SessionPlan::Market(btc_eth()), transport.clone());

    let err = finish(session.task).await.unwrap_err();
    assert!(matches!(err, BittrexError::ConnectionFailed { .. }), "{:?}", err);
    assert_eq!(transport.open_attempts(), 3);
}

#[tokio::test]
async fn test_exchange_deltas_start_with_snapshot() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let feed = btc_eth()
        .with_ticker(false)
        .with_orderbook(false)
        .with_exchange_deltas(true);
    let mut session = start(market_config(), SessionPlan::Market(feed), Arc::new(transport));

    let mut peer = accept(&mut peers).await;
    let call = expect_call(&mut peer, "SubscribeToExchangeDeltas").await;
    assert_eq!(call.args, vec![json!("BTC-ETH")]);
    peer.reply(call.id, json!(true));

    let query = expect_call(&mut peer, "QueryExchangeState").await;
    let state = r#"{"MarketName":null,"Nounce":41,"Buys":[{"Quantity":1.5,"Rate":0.025}],"Sells":[],"Fills":[]}"#;
    peer.reply(query.id, json!(encode_payload(state)));

    match next_event(&mut session.events).await {
        StreamEvent::ExchangeState(snapshot) => {
            assert!(snapshot.initial);
            assert_eq!(snapshot.market_name, "BTC-ETH");
            assert_eq!(snapshot.nounce, 41);
            assert_eq!(snapshot.buys.len(), 1);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }

    let delta = r#"{"MarketName":"BTC-ETH","Nounce":42,"Buys":[{"Type":1,"Rate":0.025,"Quantity":0}],"Sells":[],"Fills":[]}"#;
    assert!(peer.push_json(HUB, "uE", delta));
    match next_event(&mut session.events).await {
        StreamEvent::ExchangeState(delta) => {
            assert!(!delta.initial);
            assert_eq!(delta.nounce, 42);
            assert!(delta.buys[0].is_removal());
        }
        other => panic!("expected delta, got {:?}", other),
    }

    session.stop.cancel();
    assert_eq!(finish(session.task).await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_spawned_session_handle() {
    init_tracing();
    let (transport, mut peers) = MockTransport::new();
    let client = StreamClient::with_transport(market_config(), Arc::new(transport));
    let mut handle = client.spawn(SessionPlan::Market(btc_eth())).unwrap();

    let mut peer = accept(&mut peers).await;
    accept_subscribe(&mut peer).await;
    assert!(peer.push_json(HUB, "ticker", TICKER_JSON));

    let event = timeout(Duration::from_secs(2), handle.recv()).await.unwrap();
    assert!(matches!(event, Some(StreamEvent::Ticker(_))));
    assert_eq!(handle.stats().snapshot().delivered, 1);

    handle.stop();
    assert_eq!(handle.join().await.unwrap(), SessionEnd::Stopped);
}

#[tokio::test]
async fn test_order_stream_without_credentials_is_rejected() {
    let (transport, _peers) = MockTransport::new();
    let client = StreamClient::with_transport(market_config(), Arc::new(transport));
    let (tx, _rx) = mpsc::channel(1);

    let err = client
        .subscribe_order_updates(tx, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BittrexError::Configuration(_)));
}
