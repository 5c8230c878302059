//! Inbound frame routing and non-blocking delivery

use crate::decoder::decode;
use crate::events::StreamEvent;
use crate::hub::FrameHandler;
use crate::protocol::InboundFrame;
use crate::transport::TransportError;
use bittrex_types::{
    BittrexError, BittrexResult, ExchangeStateDelta, HubMethod, OrderBookSnapshot, OrderStateUpdate, Ticker,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace, warn};

/// Delivery counters, shared between the dispatcher and its owner
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
    decode_failures: AtomicU64,
    heartbeats: AtomicU64,
    last_heartbeat: Mutex<Option<Instant>>,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchCounts {
    /// Events handed to the consumer
    pub delivered: u64,
    /// Events dropped because the channel was full or closed
    pub dropped: u64,
    /// Payload blocks that failed to decode or parse
    pub decode_failures: u64,
    /// Heartbeats seen
    pub heartbeats: u64,
}

impl DispatchStats {
    /// Current counter values
    pub fn snapshot(&self) -> DispatchCounts {
        DispatchCounts {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
        }
    }

    /// When the last heartbeat arrived
    pub fn last_heartbeat(&self) -> Option<Instant> {
        *self.last_heartbeat.lock()
    }
}

/// Routes hub calls to typed events
///
/// Runs on the connection's read task and never waits for the consumer:
/// a full channel drops the newest event.
pub struct EventDispatcher {
    hub: String,
    events: mpsc::Sender<StreamEvent>,
    auth_expiring: Arc<Notify>,
    stats: Arc<DispatchStats>,
}

impl EventDispatcher {
    /// Create a dispatcher for frames from `hub`
    pub fn new(
        hub: impl Into<String>,
        events: mpsc::Sender<StreamEvent>,
        auth_expiring: Arc<Notify>,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            hub: hub.into(),
            events,
            auth_expiring,
            stats,
        }
    }

    /// Shared counters
    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Try to hand `event` to the consumer without waiting
    pub fn deliver(&self, event: StreamEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = event.kind(), key = event.key(), "Delivery channel full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(kind = event.kind(), "Delivery channel closed, dropping event");
                false
            }
        }
    }

    fn dispatch_payload(&self, method: HubMethod, payload: &Value) {
        let text = match payload {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        };

        let event = decode(&text)
            .map_err(BittrexError::from)
            .and_then(|json| parse_event(method, &json));

        match event {
            Ok(Some(event)) => {
                self.deliver(event);
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(%method, error = %e, "Skipping undecodable payload");
            }
        }
    }
}

impl FrameHandler for EventDispatcher {
    fn on_frame(&self, frame: InboundFrame) {
        if !frame.hub.eq_ignore_ascii_case(&self.hub) {
            debug!(hub = %frame.hub, "Ignoring frame from another hub");
            return;
        }

        let Some(method) = HubMethod::parse(&frame.method) else {
            debug!(method = %frame.method, "Ignoring unknown hub method");
            return;
        };

        match method {
            HubMethod::Heartbeat => {
                self.stats.heartbeats.fetch_add(1, Ordering::Relaxed);
                *self.stats.last_heartbeat.lock() = Some(Instant::now());
                trace!("Heartbeat");
            }
            HubMethod::AuthenticationExpiring => {
                debug!("Hub reports authentication expiring");
                self.auth_expiring.notify_one();
            }
            _ => {
                for payload in &frame.payloads {
                    self.dispatch_payload(method, payload);
                }
            }
        }
    }

    fn on_error(&self, error: &TransportError) {
        debug!(error = %error, "Read half failed");
    }
}

/// Parse decoded JSON into the record for `method`
pub fn parse_event(method: HubMethod, json: &str) -> BittrexResult<Option<StreamEvent>> {
    let event = match method {
        HubMethod::Ticker => StreamEvent::Ticker(serde_json::from_str::<Ticker>(json)?),
        HubMethod::OrderBook => {
            StreamEvent::OrderBook(serde_json::from_str::<OrderBookSnapshot>(json)?)
        }
        HubMethod::ExchangeDelta => {
            StreamEvent::ExchangeState(serde_json::from_str::<ExchangeStateDelta>(json)?)
        }
        HubMethod::Order => StreamEvent::Order(serde_json::from_str::<OrderStateUpdate>(json)?),
        _ => return Ok(None),
    };
    Ok(Some(event))
}
