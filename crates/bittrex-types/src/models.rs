//! Exchange records shared by the REST client and the stream

use crate::enums::{Direction, OrderStatus};
use crate::level::{deserialize_decimal, deserialize_optional_decimal};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Best bid/ask and last trade for a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Market symbol
    pub symbol: String,
    /// Rate of the last trade
    #[serde(deserialize_with = "deserialize_decimal")]
    pub last_trade_rate: Decimal,
    /// Best bid
    #[serde(deserialize_with = "deserialize_decimal")]
    pub bid_rate: Decimal,
    /// Best ask
    #[serde(deserialize_with = "deserialize_decimal")]
    pub ask_rate: Decimal,
}

impl Ticker {
    /// Ask minus bid
    pub fn spread(&self) -> Decimal {
        self.ask_rate - self.bid_rate
    }

    /// Midpoint between bid and ask
    pub fn mid_price(&self) -> Decimal {
        (self.ask_rate + self.bid_rate) / Decimal::TWO
    }
}

/// Market definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Market symbol
    pub symbol: String,
    /// Currency being traded
    pub base_currency_symbol: String,
    /// Currency prices are quoted in
    pub quote_currency_symbol: String,
    /// Smallest order quantity
    #[serde(deserialize_with = "deserialize_decimal")]
    pub min_trade_size: Decimal,
    /// Decimal places allowed in the rate
    pub precision: u32,
    /// `ONLINE` or `OFFLINE`
    pub status: String,
    /// Listing time
    pub created_at: DateTime<Utc>,
    /// Operator notice, if any
    #[serde(default)]
    pub notice: Option<String>,
    /// Jurisdictions the market is closed to
    #[serde(default)]
    pub prohibited_in: Vec<String>,
}

impl Market {
    /// Returns true if the market currently accepts orders
    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("ONLINE")
    }
}

/// Reference to the order a conditional order cancels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderToCancel {
    /// `ORDER` or `CONDITIONAL_ORDER`
    #[serde(rename = "type")]
    pub kind: String,
    /// Id of the order to cancel
    pub id: String,
}

/// Full order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id
    pub id: String,
    /// Market symbol
    pub market_symbol: String,
    /// Buy or sell
    pub direction: Direction,
    /// `LIMIT`, `MARKET`, `CEILING_LIMIT`, `CEILING_MARKET`
    #[serde(rename = "type")]
    pub order_type: String,
    /// Ordered quantity (absent on ceiling orders)
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub quantity: Option<Decimal>,
    /// Limit rate
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub limit: Option<Decimal>,
    /// Ceiling amount
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub ceiling: Option<Decimal>,
    /// Time in force as reported by the exchange
    pub time_in_force: String,
    /// Client-supplied id
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Quantity filled so far
    #[serde(deserialize_with = "deserialize_decimal")]
    pub fill_quantity: Decimal,
    /// Commission paid so far
    #[serde(deserialize_with = "deserialize_decimal")]
    pub commission: Decimal,
    /// Proceeds so far
    #[serde(deserialize_with = "deserialize_decimal")]
    pub proceeds: Decimal,
    /// Open or closed
    pub status: OrderStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Close time
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Order this one cancels when triggered
    #[serde(default)]
    pub order_to_cancel: Option<OrderToCancel>,
}

impl Order {
    /// Returns true while the order can still fill
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Returns true once the order is filled or cancelled
    pub fn is_closed(&self) -> bool {
        self.status == OrderStatus::Closed
    }

    /// Returns true if the order filled its whole quantity
    pub fn is_fully_filled(&self) -> bool {
        match self.quantity {
            Some(qty) => !qty.is_zero() && self.fill_quantity >= qty,
            None => self.is_closed() && !self.fill_quantity.is_zero(),
        }
    }

    /// Returns true if the order closed without filling completely
    pub fn is_cancelled(&self) -> bool {
        self.is_closed() && !self.is_fully_filled()
    }

    /// Quantity still to fill
    pub fn remaining_quantity(&self) -> Option<Decimal> {
        self.quantity.map(|q| (q - self.fill_quantity).max(Decimal::ZERO))
    }
}

/// Account balance for one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Currency symbol
    pub currency_symbol: String,
    /// Total balance
    #[serde(deserialize_with = "deserialize_decimal")]
    pub total: Decimal,
    /// Available for trading or withdrawal
    #[serde(deserialize_with = "deserialize_decimal")]
    pub available: Decimal,
    /// Last change
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Balance {
    /// Amount held by open orders or pending withdrawals
    pub fn reserved(&self) -> Decimal {
        self.total - self.available
    }
}
