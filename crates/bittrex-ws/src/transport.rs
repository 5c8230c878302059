//! Hub transport abstraction
//!
//! A [`Transport`] performs the SignalR handshake and hands back a pair of
//! text-frame halves. The hub connection layer owns the halves, so it can be
//! unit tested against [`MockTransport`] without network calls.

use crate::endpoint::Endpoint;
use crate::protocol::is_init_frame;
use async_trait::async_trait;
use futures::future;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, instrument};

/// Transport layer errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Negotiate or start request failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Websocket connect failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        match err {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            other => Self::ReceiveFailed(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::Handshake(err.to_string())
    }
}

/// Outbound half: text frames to the hub
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half: text frames from the hub, ending when the socket closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An opened hub socket
pub struct FrameChannel {
    /// Outbound frames
    pub sink: FrameSink,
    /// Inbound frames
    pub stream: FrameStream,
}

impl std::fmt::Debug for FrameChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameChannel").finish_non_exhaustive()
    }
}

/// Opens hub sockets
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run the handshake for `hubs` and return the opened socket
    async fn open(&self, hubs: &[String]) -> Result<FrameChannel, TransportError>;

    /// Endpoint description for logs and errors
    fn endpoint(&self) -> String;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NegotiateResponse {
    connection_token: String,
    #[serde(default)]
    protocol_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartResponse {
    response: String,
}

/// SignalR classic transport: negotiate, websocket connect, start
#[derive(Debug, Clone)]
pub struct SignalrTransport {
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl SignalrTransport {
    /// Create a transport for `endpoint`
    pub fn new(endpoint: Endpoint, request_timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("bittrex-ws/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { endpoint, http })
    }

    async fn negotiate(&self, hubs: &[String]) -> Result<NegotiateResponse, TransportError> {
        let url = self.endpoint.negotiate_url(hubs);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn start(&self, token: &str, hubs: &[String]) -> Result<(), TransportError> {
        let url = self.endpoint.start_url(token, hubs);
        let response: StartResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.response.eq_ignore_ascii_case("started") {
            Ok(())
        } else {
            Err(TransportError::Handshake(format!(
                "unexpected start response: {}",
                response.response
            )))
        }
    }
}

#[async_trait]
impl Transport for SignalrTransport {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn open(&self, hubs: &[String]) -> Result<FrameChannel, TransportError> {
        let negotiated = self.negotiate(hubs).await?;
        debug!(
            protocol = negotiated.protocol_version.as_deref().unwrap_or("?"),
            "Negotiated hub connection"
        );

        let url = self.endpoint.connect_url(&negotiated.connection_token, hubs);
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (write, read) = ws_stream.split();

        let mut stream = read.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text)),
                Ok(Message::Binary(data)) => {
                    Some(String::from_utf8(data).map_err(|e| TransportError::ReceiveFailed(e.to_string())))
                }
                // Control frames are answered by tungstenite
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        // The hub announces itself before `start` may be called
        loop {
            match stream.next().await {
                Some(Ok(text)) if is_init_frame(&text) => break,
                Some(Ok(text)) => debug!(frame = %text, "Frame before init"),
                Some(Err(e)) => return Err(e),
                None => return Err(TransportError::ConnectionClosed),
            }
        }

        self.start(&negotiated.connection_token, hubs).await?;
        debug!("Hub connection started");

        let sink = write
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(Message::Text(text))))
            .sink_map_err(|e| TransportError::SendFailed(e.to_string()));

        Ok(FrameChannel {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }

    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockPeer, MockTransport, PeerHandle};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use crate::decoder::encode_payload;
    use crate::protocol::HubInvocation;
    use futures::channel::mpsc as frames;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc;

    /// In-memory transport
    ///
    /// Every successful `open` hands a [`MockPeer`] (the server side of the
    /// socket) to the test through the receiver returned by [`MockTransport::new`].
    pub struct MockTransport {
        peers: mpsc::UnboundedSender<MockPeer>,
        open_delay: Option<Duration>,
        stalled: bool,
        failures_left: AtomicU32,
        opens: AtomicU32,
    }

    impl MockTransport {
        /// Create a transport and the receiver its peers arrive on
        pub fn new() -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
            let (peers, rx) = mpsc::unbounded_channel();
            let transport = Self {
                peers,
                open_delay: None,
                stalled: false,
                failures_left: AtomicU32::new(0),
                opens: AtomicU32::new(0),
            };
            (transport, rx)
        }

        /// Hold every handshake for `delay` after its socket is up
        ///
        /// The peer is handed out straight away, so a test can watch the
        /// half-open socket while the handshake is still pending.
        pub fn with_open_delay(mut self, delay: Duration) -> Self {
            self.open_delay = Some(delay);
            self
        }

        /// Never finish a handshake once its socket is up
        pub fn with_stalled_handshake(mut self) -> Self {
            self.stalled = true;
            self
        }

        /// Fail the next `count` handshakes
        pub fn with_failed_opens(self, count: u32) -> Self {
            self.failures_left.store(count, Ordering::SeqCst);
            self
        }

        /// Number of handshakes attempted so far
        pub fn open_attempts(&self) -> u32 {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, hubs: &[String]) -> Result<FrameChannel, TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);

            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(TransportError::ConnectionFailed("mock connection failure".into()));
            }

            let (out_tx, out_rx) = frames::unbounded::<String>();
            let (in_tx, in_rx) = frames::unbounded::<Result<String, TransportError>>();

            let peer = MockPeer {
                hubs: hubs.to_vec(),
                outbound: out_rx,
                handle: PeerHandle { inbound: in_tx },
            };
            self.peers
                .send(peer)
                .map_err(|_| TransportError::ConnectionFailed("mock peer receiver dropped".into()))?;

            if self.stalled {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.open_delay {
                tokio::time::sleep(delay).await;
            }

            Ok(FrameChannel {
                sink: Box::pin(out_tx.sink_map_err(|_| TransportError::ConnectionClosed)),
                stream: Box::pin(in_rx),
            })
        }

        fn endpoint(&self) -> String {
            "mock://hub".to_string()
        }
    }

    /// Server side of a mock socket
    pub struct MockPeer {
        hubs: Vec<String>,
        outbound: frames::UnboundedReceiver<String>,
        handle: PeerHandle,
    }

    impl MockPeer {
        /// Hubs named in the handshake
        pub fn hubs(&self) -> &[String] {
            &self.hubs
        }

        /// Cloneable handle for pushing frames from another task
        pub fn handle(&self) -> PeerHandle {
            self.handle.clone()
        }

        /// Next frame the client sent; `None` once the client closed its half
        pub async fn next_frame(&mut self) -> Option<String> {
            self.outbound.next().await
        }

        /// Next invocation the client sent, skipping anything else
        pub async fn next_call(&mut self) -> Option<HubInvocation> {
            while let Some(text) = self.next_frame().await {
                if let Ok(invocation) = serde_json::from_str(&text) {
                    return Some(invocation);
                }
            }
            None
        }
    }

    impl std::ops::Deref for MockPeer {
        type Target = PeerHandle;

        fn deref(&self) -> &PeerHandle {
            &self.handle
        }
    }

    /// Sends frames to the client
    #[derive(Clone)]
    pub struct PeerHandle {
        inbound: frames::UnboundedSender<Result<String, TransportError>>,
    }

    impl PeerHandle {
        /// Send a raw text frame
        pub fn send_raw(&self, text: impl Into<String>) -> bool {
            self.inbound.unbounded_send(Ok(text.into())).is_ok()
        }

        /// Answer invocation `id` with `result`
        pub fn reply(&self, id: u64, result: Value) -> bool {
            self.send_raw(json!({ "R": result, "I": id.to_string() }).to_string())
        }

        /// Answer invocation `id` with a hub error
        pub fn reply_error(&self, id: u64, message: &str) -> bool {
            self.send_raw(json!({ "I": id.to_string(), "E": message }).to_string())
        }

        /// Push a hub-to-client call with the given payload blocks
        pub fn push(&self, hub: &str, method: &str, payloads: Vec<Value>) -> bool {
            let frame = json!({
                "C": "d-0,1",
                "M": [{ "H": hub, "M": method, "A": payloads }],
            });
            self.send_raw(frame.to_string())
        }

        /// Push one JSON document, compressed the way the hub does it
        pub fn push_json(&self, hub: &str, method: &str, json: &str) -> bool {
            self.push(hub, method, vec![Value::String(encode_payload(json))])
        }

        /// Fail the client's read half
        pub fn fail(&self, error: TransportError) -> bool {
            self.inbound.unbounded_send(Err(error)).is_ok()
        }

        /// Close the socket from the server side
        pub fn disconnect(&self) {
            self.inbound.close_channel();
        }
    }
}
