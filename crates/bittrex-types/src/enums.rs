//! Hub method, order and book-change enums

use serde::{Deserialize, Serialize};
use std::fmt;

/// Push methods the hub invokes on the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HubMethod {
    /// Liveness ping, no payload
    Heartbeat,
    /// Ticker update for a market
    Ticker,
    /// Orderbook update (25 levels)
    OrderBook,
    /// Exchange-state delta for a market
    ExchangeDelta,
    /// Account order update
    Order,
    /// Server notice that the authenticated session is about to expire
    AuthenticationExpiring,
}

impl HubMethod {
    /// Returns the method name as sent by the hub
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heartbeat => "heartbeat",
            Self::Ticker => "ticker",
            Self::OrderBook => "orderBook",
            Self::ExchangeDelta => "uE",
            Self::Order => "order",
            Self::AuthenticationExpiring => "authenticationExpiring",
        }
    }

    /// Look up a method by name
    ///
    /// The hub is inconsistent about casing, so names compare
    /// case-insensitively. Unknown names return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        [
            Self::Heartbeat,
            Self::Ticker,
            Self::OrderBook,
            Self::ExchangeDelta,
            Self::Order,
            Self::AuthenticationExpiring,
        ]
        .into_iter()
        .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns true if frames for this method carry compressed payloads
    pub fn carries_payload(&self) -> bool {
        matches!(
            self,
            Self::Ticker | Self::OrderBook | Self::ExchangeDelta | Self::Order
        )
    }
}

impl fmt::Display for HubMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl Direction {
    /// Returns the opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Order status as reported by v3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Resting or partially filled
    Open,
    /// Filled or cancelled
    Closed,
}

/// Order time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    /// Rests until filled or cancelled
    #[default]
    GoodTilCancelled,
    /// Fills what it can immediately, cancels the rest
    ImmediateOrCancel,
    /// Fills completely or not at all
    FillOrKill,
    /// Maker-only, rests until cancelled
    PostOnlyGoodTilCancelled,
    /// Market-style immediate buy
    BuyNow,
    /// Instant execution
    Instant,
}

/// Kind of change applied to an orderbook level in an exchange delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum LevelChangeType {
    /// New price level
    #[default]
    Add,
    /// Level removed from the book
    Remove,
    /// Quantity at an existing level changed
    Update,
}

impl TryFrom<u8> for LevelChangeType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Add),
            1 => Ok(Self::Remove),
            2 => Ok(Self::Update),
            other => Err(format!("unknown level change type {}", other)),
        }
    }
}

impl From<LevelChangeType> for u8 {
    fn from(value: LevelChangeType) -> Self {
        match value {
            LevelChangeType::Add => 0,
            LevelChangeType::Remove => 1,
            LevelChangeType::Update => 2,
        }
    }
}

/// Kind of change an order update represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderChangeType {
    /// Order accepted and resting
    Open,
    /// Order partially filled, still open
    Partial,
    /// Order completely filled
    Fill,
    /// Order cancelled (possibly after partial fills)
    Cancel,
}

impl TryFrom<u8> for OrderChangeType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Open),
            1 => Ok(Self::Partial),
            2 => Ok(Self::Fill),
            3 => Ok(Self::Cancel),
            other => Err(format!("unknown order change type {}", other)),
        }
    }
}

impl From<OrderChangeType> for u8 {
    fn from(value: OrderChangeType) -> Self {
        match value {
            OrderChangeType::Open => 0,
            OrderChangeType::Partial => 1,
            OrderChangeType::Fill => 2,
            OrderChangeType::Cancel => 3,
        }
    }
}

impl OrderChangeType {
    /// Returns true if no further updates follow for this order
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fill | Self::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_method_parse() {
        assert_eq!(HubMethod::parse("orderBook"), Some(HubMethod::OrderBook));
        assert_eq!(HubMethod::parse("ORDERBOOK"), Some(HubMethod::OrderBook));
        assert_eq!(HubMethod::parse("uE"), Some(HubMethod::ExchangeDelta));
        assert_eq!(
            HubMethod::parse("authenticationExpiring"),
            Some(HubMethod::AuthenticationExpiring)
        );
        assert_eq!(HubMethod::parse("marketSummaries"), None);
    }

    #[test]
    fn test_hub_method_payloads() {
        assert!(HubMethod::Ticker.carries_payload());
        assert!(!HubMethod::Heartbeat.carries_payload());
        assert!(!HubMethod::AuthenticationExpiring.carries_payload());
    }

    #[test]
    fn test_direction_serde() {
        let dir: Direction = serde_json::from_str(r#""BUY""#).unwrap();
        assert_eq!(dir, Direction::Buy);
        assert_eq!(dir.opposite(), Direction::Sell);
        assert_eq!(serde_json::to_string(&Direction::Sell).unwrap(), r#""SELL""#);
    }

    #[test]
    fn test_time_in_force_serde() {
        assert_eq!(
            serde_json::to_string(&TimeInForce::GoodTilCancelled).unwrap(),
            r#""GOOD_TIL_CANCELLED""#
        );
        assert_eq!(
            serde_json::to_string(&TimeInForce::PostOnlyGoodTilCancelled).unwrap(),
            r#""POST_ONLY_GOOD_TIL_CANCELLED""#
        );
    }

    #[test]
    fn test_level_change_type_from_int() {
        let change: LevelChangeType = serde_json::from_str("2").unwrap();
        assert_eq!(change, LevelChangeType::Update);
        assert!(serde_json::from_str::<LevelChangeType>("7").is_err());
    }

    #[test]
    fn test_order_change_type_terminal() {
        assert!(OrderChangeType::Fill.is_terminal());
        assert!(OrderChangeType::Cancel.is_terminal());
        assert!(!OrderChangeType::Partial.is_terminal());
    }
}
