//! Streaming client for the Bittrex SignalR hub
//!
//! Opens a hub connection, optionally signs in with an HMAC-signed
//! challenge, subscribes to market or account channels, and delivers the
//! decoded updates on a bounded channel until the caller stops the session
//! or the hub disconnects.
//!
//! # Layers
//!
//! - [`transport`] - negotiate/connect/start handshake and raw text frames
//! - [`hub`] - deadline-bounded connect and serialized hub calls
//! - [`decoder`] - base64 + raw-deflate payload decoding
//! - [`auth`] - signed-challenge authentication
//! - [`subscription`] - channel subscription and acknowledgement checks
//! - [`dispatcher`] - non-blocking delivery of typed events
//! - [`session`] - the supervisor tying these together
//!
//! # Example
//!
//! ```no_run
//! use bittrex_ws::{MarketFeed, StreamClient, StreamConfig, StreamEvent};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StreamClient::new(StreamConfig::new());
//!     let (tx, mut rx) = mpsc::channel(256);
//!     let stop = CancellationToken::new();
//!
//!     let session = tokio::spawn({
//!         let client = client.clone();
//!         let stop = stop.clone();
//!         async move {
//!             let feed = MarketFeed::new("BTC-ETH".parse()?);
//!             Ok::<_, Box<dyn std::error::Error + Send + Sync>>(
//!                 client.subscribe_updates(feed, tx, stop).await?,
//!             )
//!         }
//!     });
//!
//!     while let Some(event) = rx.recv().await {
//!         if let StreamEvent::Ticker(ticker) = event {
//!             println!("{} last {}", ticker.symbol, ticker.last_trade_rate);
//!             stop.cancel();
//!         }
//!     }
//!
//!     let _ = session.await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod decoder;
pub mod dispatcher;
pub mod endpoint;
pub mod events;
pub mod hub;
pub mod protocol;
pub mod retry;
pub mod session;
pub mod subscription;
pub mod transport;

pub use auth::{AuthScheme, Authenticator};
pub use decoder::{decode, DecodeError};
pub use dispatcher::{DispatchCounts, DispatchStats, EventDispatcher};
pub use endpoint::Endpoint;
pub use events::{AuthState, SessionEnd, SessionState, StreamEvent};
pub use hub::{ConnectOptions, FrameHandler, HubCaller, HubConnection};
pub use retry::RetryPolicy;
pub use session::{
    MarketFeed, SessionHandle, SessionPlan, SessionSupervisor, StreamClient, StreamConfig,
    DEFAULT_HUB,
};
pub use subscription::{Subscription, SubscriptionManager};
pub use transport::{SignalrTransport, Transport, TransportError};

#[cfg(any(test, feature = "test-utils"))]
pub use transport::{MockPeer, MockTransport, PeerHandle};

#[cfg(any(test, feature = "test-utils"))]
pub use decoder::{encode_payload, encode_payload_with_checksum};
