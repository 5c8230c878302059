//! Request and response types specific to the REST API
//!
//! Records shared with the stream ([`Order`](bittrex_types::Order),
//! [`Ticker`](bittrex_types::Ticker), ...) live in `bittrex-types`.

use bittrex_types::{BookEntry, Direction, MarketSymbol, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Depths the orderbook endpoint accepts
pub const ORDERBOOK_DEPTHS: [u32; 3] = [1, 25, 500];

/// Orderbook returned by `GET /markets/{symbol}/orderbook`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderBook {
    /// Bids, best first
    #[serde(default)]
    pub bid: Vec<BookEntry>,
    /// Asks, best first
    #[serde(default)]
    pub ask: Vec<BookEntry>,
}

impl OrderBook {
    /// Best bid, if any
    pub fn best_bid(&self) -> Option<&BookEntry> {
        self.bid.first()
    }

    /// Best ask, if any
    pub fn best_ask(&self) -> Option<&BookEntry> {
        self.ask.first()
    }

    /// Ask minus bid
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.rate - self.best_bid()?.rate)
    }
}

/// Body of `POST /orders`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Market
    pub market_symbol: MarketSymbol,
    /// Buy or sell
    pub direction: Direction,
    /// Order type (`LIMIT`)
    #[serde(rename = "type")]
    pub order_type: &'static str,
    /// Quantity
    pub quantity: Decimal,
    /// Limit rate
    pub limit: Decimal,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Optional client-supplied id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}

impl NewOrder {
    /// Limit order
    pub fn limit(
        market_symbol: MarketSymbol,
        direction: Direction,
        quantity: Decimal,
        limit: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            market_symbol,
            direction,
            order_type: "LIMIT",
            quantity,
            limit,
            time_in_force,
            client_order_id: None,
        }
    }

    /// Attach a client order id
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Reject non-positive quantity or rate
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= Decimal::ZERO {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        if self.limit <= Decimal::ZERO {
            return Err(format!("limit must be positive, got {}", self.limit));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarketQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_symbol: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_orderbook_from_json() {
        let json = r#"{
            "bid": [{"quantity": "0.5", "rate": "9000.1"}, {"quantity": "1.0", "rate": "9000.0"}],
            "ask": [{"quantity": "0.2", "rate": "9001.3"}]
        }"#;
        let book: OrderBook = serde_json::from_str(json).unwrap();
        assert_eq!(book.best_bid().unwrap().rate, dec!(9000.1));
        assert_eq!(book.spread(), Some(dec!(1.2)));
    }

    #[test]
    fn test_new_order_body() {
        let order = NewOrder::limit(
            "eth-btc".parse().unwrap(),
            Direction::Buy,
            dec!(1.5),
            dec!(0.025),
            TimeInForce::GoodTilCancelled,
        );
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["marketSymbol"], "ETH-BTC");
        assert_eq!(body["direction"], "BUY");
        assert_eq!(body["type"], "LIMIT");
        assert_eq!(body["quantity"], "1.5");
        assert_eq!(body["limit"], "0.025");
        assert_eq!(body["timeInForce"], "GOOD_TIL_CANCELLED");
        assert!(body.get("clientOrderId").is_none());
    }

    #[test]
    fn test_new_order_validation() {
        let order = NewOrder::limit(
            "ETH-BTC".parse().unwrap(),
            Direction::Sell,
            Decimal::ZERO,
            dec!(0.025),
            TimeInForce::ImmediateOrCancel,
        );
        assert!(order.validate().is_err());
    }
}
