//! Shared types for the Bittrex streaming and REST clients
//!
//! This crate provides the record types used across the workspace. It has
//! minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`MarketSymbol`] - Market names (e.g., "BTC-ETH")
//! - [`BookEntry`], [`LevelChange`] - Orderbook levels with decimal precision
//! - [`HubMethod`], [`Direction`], [`OrderStatus`] - Protocol and order enums
//! - [`ExchangeStateDelta`], [`OrderStateUpdate`], [`OrderBookSnapshot`] - Pushed stream records
//! - [`Ticker`], [`Order`], [`Balance`], [`Market`] - Exchange records
//! - [`BittrexError`] - Error taxonomy

pub mod enums;
pub mod error;
pub mod level;
pub mod messages;
pub mod models;
pub mod symbol;

// Re-export commonly used types
pub use enums::*;
pub use error::*;
pub use level::*;
pub use messages::*;
pub use models::*;
pub use symbol::*;

// Re-export rust_decimal for users
pub use rust_decimal::Decimal;
