//! Channel subscriptions and acknowledgement checking

use crate::decoder::decode;
use crate::hub::HubCaller;
use bittrex_types::{BittrexError, BittrexResult, ExchangeStateDelta, MarketSymbol};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument};

/// Orderbook depth used for book channels
pub const ORDERBOOK_DEPTH: u32 = 25;

/// One thing the session can register interest in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Liveness pings
    Heartbeat,
    /// Account order updates (requires authentication)
    Orders,
    /// Ticker for a market
    Ticker(MarketSymbol),
    /// 25-level orderbook for a market
    OrderBook(MarketSymbol),
    /// Exchange-state deltas for a market, seeded by a snapshot
    ExchangeDeltas(MarketSymbol),
}

impl Subscription {
    /// Channel name passed to `Subscribe`; `None` for exchange deltas, which
    /// use their own hub method
    pub fn channel_name(&self) -> Option<String> {
        match self {
            Self::Heartbeat => Some("heartbeat".to_string()),
            Self::Orders => Some("order".to_string()),
            Self::Ticker(m) => Some(format!("ticker_{}", m)),
            Self::OrderBook(m) => Some(format!("orderbook_{}_{}", m, ORDERBOOK_DEPTH)),
            Self::ExchangeDeltas(_) => None,
        }
    }

    /// Market this subscription is for
    pub fn market(&self) -> Option<&MarketSymbol> {
        match self {
            Self::Ticker(m) | Self::OrderBook(m) | Self::ExchangeDeltas(m) => Some(m),
            Self::Heartbeat | Self::Orders => None,
        }
    }

    /// Returns true if the hub only accepts this after authentication
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Orders)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExchangeDeltas(m) => write!(f, "exchangeDeltas_{}", m),
            other => f.write_str(&other.channel_name().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscribeAck {
    #[serde(rename = "Success", alias = "success")]
    success: bool,
    #[serde(rename = "ErrorCode", alias = "errorCode", default)]
    error_code: Option<Value>,
}

/// Tracks accepted subscriptions and issues the hub calls
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    active: RwLock<HashSet<Subscription>>,
}

impl SubscriptionManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to everything in `subs`
    ///
    /// Channel subscriptions go out in one `Subscribe` call; exchange deltas
    /// follow, one market at a time. Returns the exchange-state snapshots
    /// (with `initial` set) in request order.
    pub async fn subscribe(
        &self,
        caller: &dyn HubCaller,
        subs: &[Subscription],
    ) -> BittrexResult<Vec<ExchangeStateDelta>> {
        let channels: Vec<Subscription> = subs
            .iter()
            .filter(|s| s.channel_name().is_some())
            .cloned()
            .collect();
        if !channels.is_empty() {
            self.subscribe_channels(caller, &channels).await?;
        }

        let mut snapshots = Vec::new();
        for sub in subs {
            if let Subscription::ExchangeDeltas(market) = sub {
                snapshots.push(self.subscribe_exchange_deltas(caller, market).await?);
            }
        }
        Ok(snapshots)
    }

    /// Send one `Subscribe` call and check every acknowledgement
    ///
    /// Already-active channels are sent again; the hub acknowledges each one.
    #[instrument(skip(self, caller, channels), fields(count = channels.len()))]
    pub async fn subscribe_channels(
        &self,
        caller: &dyn HubCaller,
        channels: &[Subscription],
    ) -> BittrexResult<()> {
        let names: Vec<String> = channels.iter().filter_map(Subscription::channel_name).collect();
        debug!(?names, "Subscribing");

        let response = caller.call("Subscribe", vec![json!(names)]).await?;
        let acks: Vec<SubscribeAck> = serde_json::from_value(response).map_err(|e| {
            BittrexError::call_failed("Subscribe", format!("malformed acknowledgement: {}", e))
        })?;

        if acks.len() != names.len() {
            return Err(BittrexError::call_failed(
                "Subscribe",
                format!("expected {} acknowledgements, got {}", names.len(), acks.len()),
            ));
        }

        let mut active = Vec::with_capacity(channels.len());
        for ((sub, name), ack) in channels.iter().zip(&names).zip(acks) {
            if !ack.success {
                self.extend(active);
                return Err(BittrexError::subscription_rejected(
                    name.clone(),
                    ack.error_code.map(error_code_text),
                ));
            }
            active.push(sub.clone());
        }

        info!(channels = ?names, "Subscribed");
        self.extend(active);
        Ok(())
    }

    /// Register for exchange deltas on `market` and fetch the snapshot
    #[instrument(skip(self, caller), fields(market = %market))]
    pub async fn subscribe_exchange_deltas(
        &self,
        caller: &dyn HubCaller,
        market: &MarketSymbol,
    ) -> BittrexResult<ExchangeStateDelta> {
        let sub = Subscription::ExchangeDeltas(market.clone());

        let ack = caller
            .call("SubscribeToExchangeDeltas", vec![json!(market.as_str())])
            .await?;
        if ack == Value::Bool(false) {
            return Err(BittrexError::subscription_rejected(sub.to_string(), None));
        }
        self.extend([sub]);

        let state = caller
            .call("QueryExchangeState", vec![json!(market.as_str())])
            .await?;
        let snapshot = parse_exchange_state(state)?;
        debug!(nounce = snapshot.nounce, "Exchange state snapshot received");

        Ok(snapshot.into_snapshot(market.as_str()))
    }

    /// Returns true if `sub` was acknowledged
    pub fn is_subscribed(&self, sub: &Subscription) -> bool {
        self.active.read().contains(sub)
    }

    /// All acknowledged subscriptions
    pub fn active(&self) -> Vec<Subscription> {
        self.active.read().iter().cloned().collect()
    }

    /// Number of acknowledged subscriptions
    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    /// Returns true if nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }

    /// Forget everything (the connection is gone)
    pub fn clear(&self) {
        self.active.write().clear();
    }

    fn extend(&self, subs: impl IntoIterator<Item = Subscription>) {
        self.active.write().extend(subs);
    }
}

/// `QueryExchangeState` answers with a compressed string or a plain object
fn parse_exchange_state(state: Value) -> BittrexResult<ExchangeStateDelta> {
    match state {
        Value::String(payload) => {
            let json = decode(&payload)?;
            Ok(serde_json::from_str(&json)?)
        }
        Value::Object(_) => Ok(serde_json::from_value(state)?),
        other => Err(BittrexError::call_failed(
            "QueryExchangeState",
            format!("unexpected result: {}", other),
        )),
    }
}

fn error_code_text(code: Value) -> String {
    match code {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
