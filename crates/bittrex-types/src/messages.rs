//! Records pushed by the streaming hub

use crate::enums::{Direction, OrderChangeType, OrderStatus};
use crate::level::{deserialize_decimal, deserialize_optional_decimal, BookEntry, LevelChange};
use crate::models::Order;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// 25-level orderbook update for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Market symbol
    #[serde(rename = "marketSymbol", default)]
    pub market_symbol: String,
    /// Book depth the update was produced for
    #[serde(default)]
    pub depth: Option<u32>,
    /// Per-market sequence number
    #[serde(default)]
    pub sequence: Option<u64>,
    /// Bid levels
    #[serde(alias = "buy", alias = "bidDeltas", default)]
    pub bids: Vec<BookEntry>,
    /// Ask levels
    #[serde(alias = "sell", alias = "askDeltas", default)]
    pub asks: Vec<BookEntry>,
}

impl OrderBookSnapshot {
    /// Best bid by rate
    pub fn best_bid(&self) -> Option<&BookEntry> {
        self.bids.iter().max_by_key(|e| e.rate)
    }

    /// Best ask by rate
    pub fn best_ask(&self) -> Option<&BookEntry> {
        self.asks.iter().min_by_key(|e| e.rate)
    }
}

/// A trade reported inside an exchange-state delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fill {
    /// Trade id (snapshots only)
    #[serde(default)]
    pub id: Option<u64>,
    /// Taker side
    pub order_type: Direction,
    /// Trade price
    #[serde(alias = "Price", deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
    /// Trade quantity
    #[serde(deserialize_with = "deserialize_decimal")]
    pub quantity: Decimal,
    /// Quantity times price
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub total: Option<Decimal>,
    /// `FILL` or `PARTIAL_FILL`
    #[serde(default)]
    pub fill_type: Option<String>,
    /// Exchange time, UTC without offset
    #[serde(default)]
    pub time_stamp: Option<NaiveDateTime>,
}

/// Incremental change to a market's exchange state
///
/// `nounce` never decreases for a market. Gaps are left for the consumer to
/// detect; deltas are delivered exactly in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExchangeStateDelta {
    /// Market name (null in query snapshots, filled in by the caller)
    #[serde(default, deserialize_with = "null_as_default")]
    pub market_name: String,
    /// Per-market sequence number
    pub nounce: u64,
    /// Bid level changes
    #[serde(default)]
    pub buys: Vec<LevelChange>,
    /// Ask level changes
    #[serde(default)]
    pub sells: Vec<LevelChange>,
    /// Trades since the previous delta
    #[serde(default)]
    pub fills: Vec<Fill>,
    /// True only for the snapshot returned by `QueryExchangeState`
    #[serde(default, skip_deserializing)]
    pub initial: bool,
}

impl ExchangeStateDelta {
    /// Mark this record as a full-state snapshot for `market`
    pub fn into_snapshot(mut self, market: &str) -> Self {
        if self.market_name.is_empty() {
            self.market_name = market.to_string();
        }
        self.initial = true;
        self
    }

    /// Returns true if `next` skips one or more sequence numbers
    pub fn has_gap_before(&self, next: &ExchangeStateDelta) -> bool {
        next.nounce > self.nounce.saturating_add(1)
    }
}

/// Change to one of the account's orders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawOrderStateUpdate")]
pub struct OrderStateUpdate {
    /// Account the order belongs to
    pub account_id: String,
    /// Per-account sequence number
    pub sequence: u64,
    /// What happened to the order
    pub change_type: OrderChangeType,
    /// Order record after the change
    pub delta: Order,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderStateUpdate {
    #[serde(default)]
    account_id: String,
    #[serde(default)]
    sequence: u64,
    #[serde(default, rename = "type")]
    change_type: Option<OrderChangeType>,
    delta: Order,
}

impl From<RawOrderStateUpdate> for OrderStateUpdate {
    fn from(raw: RawOrderStateUpdate) -> Self {
        let change_type = raw
            .change_type
            .unwrap_or_else(|| derive_change_type(&raw.delta));
        Self {
            account_id: raw.account_id,
            sequence: raw.sequence,
            change_type,
            delta: raw.delta,
        }
    }
}

fn derive_change_type(order: &Order) -> OrderChangeType {
    match order.status {
        OrderStatus::Closed if order.is_fully_filled() => OrderChangeType::Fill,
        OrderStatus::Closed => OrderChangeType::Cancel,
        OrderStatus::Open if !order.fill_quantity.is_zero() => OrderChangeType::Partial,
        OrderStatus::Open => OrderChangeType::Open,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
