//! Stream events and session states

use bittrex_types::{ExchangeStateDelta, OrderBookSnapshot, OrderStateUpdate, Ticker};
use std::fmt;

/// Decoded record delivered to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Ticker update
    Ticker(Ticker),
    /// 25-level orderbook update
    OrderBook(OrderBookSnapshot),
    /// Exchange-state delta, or the initial snapshot
    ExchangeState(ExchangeStateDelta),
    /// Account order change
    Order(OrderStateUpdate),
}

impl StreamEvent {
    /// Market (or account, for order updates) the event belongs to
    pub fn key(&self) -> &str {
        match self {
            Self::Ticker(t) => &t.symbol,
            Self::OrderBook(b) => &b.market_symbol,
            Self::ExchangeState(d) => &d.market_name,
            Self::Order(o) => &o.account_id,
        }
    }

    /// Short name of the event kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ticker(_) => "ticker",
            Self::OrderBook(_) => "orderbook",
            Self::ExchangeState(_) => "exchange_state",
            Self::Order(_) => "order",
        }
    }
}

/// How a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The caller's stop token fired
    Stopped,
    /// The hub closed the connection
    Disconnected,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not started
    #[default]
    Idle,
    /// Handshake in progress
    Connecting,
    /// Signing in (also used while re-authenticating mid-stream)
    Authenticating,
    /// Registering channels
    Subscribing,
    /// Delivering events
    Streaming,
    /// Releasing the connection
    Closing,
    /// Done
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Authenticating => "authenticating",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Authentication state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Never authenticated (market sessions stay here)
    #[default]
    Unauthenticated,
    /// Hub accepted the last `Authenticate`
    Authenticated,
    /// Hub warned of expiry, or the last re-authentication failed
    Expired,
}
