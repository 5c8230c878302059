//! Shared fixtures for session tests

#![allow(dead_code)]

use bittrex_auth::Credentials;
use bittrex_ws::protocol::HubInvocation;
use bittrex_ws::{MockPeer, StreamConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const HUB: &str = "CoreHub";

pub const TICKER_JSON: &str =
    r#"{"symbol":"BTC-ETH","lastTradeRate":"0.02500000","bidRate":"0.02490000","askRate":"0.02510000"}"#;

pub const ORDER_JSON: &str = r#"{
    "accountId": "6c3f4c56-2a34-4b7b-8d2e-6c1f3a9b9d01",
    "sequence": 12,
    "delta": {
        "id": "8ad8e2c1-1a4b-4e4a-9d3c-5d2e0cfa0d11",
        "marketSymbol": "ETH-BTC",
        "direction": "SELL",
        "type": "LIMIT",
        "quantity": "2.00000000",
        "limit": "0.03000000",
        "timeInForce": "GOOD_TIL_CANCELLED",
        "fillQuantity": "2.00000000",
        "commission": "0.00015000",
        "proceeds": "0.06000000",
        "status": "CLOSED",
        "createdAt": "2020-03-13T19:48:39.55Z",
        "closedAt": "2020-03-13T19:52:10.02Z"
    }
}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("bittrex_ws=debug")
        .try_init();
}

pub fn market_config() -> StreamConfig {
    StreamConfig::new()
        .with_market_connect_timeout(Duration::from_secs(2))
        .with_call_timeout(Duration::from_secs(2))
        .with_channel_capacity(16)
        .without_retry()
}

pub fn order_config() -> StreamConfig {
    StreamConfig::new()
        .with_order_connect_timeout(Duration::from_secs(2))
        .with_call_timeout(Duration::from_secs(2))
        .with_channel_capacity(16)
        .with_credentials(Credentials::new("test-key", "test-secret").unwrap())
        .without_retry()
}

/// Wait for the next peer the transport hands out
pub async fn accept(peers: &mut mpsc::UnboundedReceiver<MockPeer>) -> MockPeer {
    timeout(Duration::from_secs(2), peers.recv())
        .await
        .expect("no connection attempt")
        .expect("transport dropped")
}

/// Wait for the next invocation and check its method
pub async fn expect_call(peer: &mut MockPeer, method: &str) -> HubInvocation {
    let call = timeout(Duration::from_secs(2), peer.next_call())
        .await
        .unwrap_or_else(|_| panic!("no {} call", method))
        .unwrap_or_else(|| panic!("socket closed before {}", method));
    assert_eq!(call.method, method);
    assert_eq!(call.hub, HUB);
    call
}

/// Answer a `Subscribe` call, accepting every channel
pub async fn accept_subscribe(peer: &mut MockPeer) -> Vec<String> {
    let call = expect_call(peer, "Subscribe").await;
    let channels: Vec<String> = serde_json::from_value(call.args[0].clone()).unwrap();
    let acks: Vec<Value> = channels
        .iter()
        .map(|_| json!({ "Success": true, "ErrorCode": null }))
        .collect();
    peer.reply(call.id, json!(acks));
    channels
}

/// Poll `check` until it holds or a second passes
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
