//! REST API client for the Bittrex exchange (v3)
//!
//! # Features
//!
//! - **Market Data**: markets, ticker, orderbook
//! - **Account**: balances, open and closed orders
//! - **Trading**: limit orders, cancel
//!
//! # Authentication
//!
//! Private endpoints require API credentials. Each request carries
//! `Api-Key`, `Api-Timestamp`, `Api-Content-Hash` (SHA-512 of the body) and
//! `Api-Signature` (HMAC-SHA512 of timestamp, URL, method and content hash).
//!
//! # Example
//!
//! ```no_run
//! use bittrex_rest::{BittrexRestClient, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BittrexRestClient::new()?;
//!     let book = client.get_orderbook("ETH-BTC", Some(25)).await?;
//!     println!("spread: {:?}", book.spread());
//!
//!     let auth_client = BittrexRestClient::with_credentials(Credentials::from_env()?)?;
//!     for order in auth_client.get_open_orders(None).await? {
//!         println!("{} {:?} {}", order.id, order.direction, order.market_symbol);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoints;
pub mod error;
pub mod types;

// Re-export main types
pub use bittrex_auth::Credentials;
pub use client::{BittrexRestClient, ClientConfig, DEFAULT_BASE_URL};
pub use error::{RestError, RestResult};
pub use types::{NewOrder, OrderBook, ORDERBOOK_DEPTHS};
