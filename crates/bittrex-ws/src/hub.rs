//! Hub connection: deadline-bounded connect, serialized calls, read task

use crate::protocol::{parse_frame, HubInvocation, InboundFrame, ServerFrame};
use crate::transport::{FrameSink, FrameStream, Transport, TransportError};
use async_trait::async_trait;
use bittrex_types::{BittrexError, BittrexResult};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// Receives inbound traffic on the connection's read task
///
/// Implementations must not block: the read task calls them inline for
/// every frame.
pub trait FrameHandler: Send + Sync {
    /// A hub-to-client call arrived
    fn on_frame(&self, frame: InboundFrame);

    /// The read half failed; the connection is about to report disconnect
    fn on_error(&self, error: &TransportError) {
        let _ = error;
    }
}

/// Invokes hub methods
#[async_trait]
pub trait HubCaller: Send + Sync {
    /// Call `method` with positional `args` and wait for its result
    async fn call(&self, method: &str, args: Vec<Value>) -> BittrexResult<Value>;
}

/// Deadlines for one connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    /// Handshake deadline
    pub connect_timeout: Duration,
    /// Per-call deadline
    pub call_timeout: Duration,
}

type CallOutcome = Result<Value, String>;
type PendingCalls = DashMap<u64, oneshot::Sender<CallOutcome>>;

/// An open hub connection
///
/// Calls are serialized: the outbound half stays locked from sending an
/// invocation until its result, its deadline, or a disconnect is observed.
pub struct HubConnection {
    hub: String,
    endpoint: String,
    call_timeout: Duration,
    sink: Mutex<FrameSink>,
    pending: Arc<PendingCalls>,
    next_id: AtomicU64,
    disconnected: CancellationToken,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl HubConnection {
    /// Open a connection to `hub`
    ///
    /// The handshake runs on its own task. If the deadline passes first this
    /// returns `ConnectionTimeout` and the handshake is abandoned, dropping
    /// any half-open socket. A handshake that completes in the same instant
    /// has its socket closed by that task.
    #[instrument(skip(transport, handler), fields(endpoint = %transport.endpoint()))]
    pub async fn connect(
        transport: Arc<dyn Transport>,
        hub: &str,
        handler: Arc<dyn FrameHandler>,
        options: ConnectOptions,
    ) -> BittrexResult<Self> {
        let endpoint = transport.endpoint();
        let hubs = vec![hub.to_string()];
        let (mut tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            // Dropping `open` on timeout drops whatever socket it holds so far
            let result = tokio::select! {
                result = transport.open(&hubs) => result,
                _ = tx.closed() => {
                    debug!("Abandoning hub handshake after the deadline");
                    return;
                }
            };
            if let Err(Ok(mut late)) = tx.send(result) {
                debug!("Closing hub socket opened after the deadline");
                let _ = late.sink.close().await;
            }
        });

        let channel = match tokio::time::timeout(options.connect_timeout, rx).await {
            Ok(Ok(Ok(channel))) => channel,
            Ok(Ok(Err(e))) => {
                return Err(BittrexError::ConnectionFailed {
                    url: endpoint,
                    reason: e.to_string(),
                })
            }
            Ok(Err(_)) => {
                return Err(BittrexError::ConnectionFailed {
                    url: endpoint,
                    reason: "handshake task ended without a result".into(),
                })
            }
            Err(_) => {
                warn!(timeout = ?options.connect_timeout, "Hub handshake timed out");
                return Err(BittrexError::ConnectionTimeout {
                    url: endpoint,
                    timeout: options.connect_timeout,
                });
            }
        };

        info!(hub, "Connected to hub");
        Ok(Self::from_channel(
            hub,
            endpoint,
            channel.sink,
            channel.stream,
            handler,
            options.call_timeout,
        ))
    }

    fn from_channel(
        hub: &str,
        endpoint: String,
        sink: FrameSink,
        stream: FrameStream,
        handler: Arc<dyn FrameHandler>,
        call_timeout: Duration,
    ) -> Self {
        let pending = Arc::new(PendingCalls::new());
        let disconnected = CancellationToken::new();
        let reader = tokio::spawn(read_loop(
            stream,
            handler,
            pending.clone(),
            disconnected.clone(),
        ));

        Self {
            hub: hub.to_string(),
            endpoint,
            call_timeout,
            sink: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(0),
            disconnected,
            reader: parking_lot::Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        }
    }

    /// Hub this connection talks to
    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Endpoint this connection was opened against
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns true until the socket closes or `close` is called
    pub fn is_connected(&self) -> bool {
        !self.disconnected.is_cancelled()
    }

    /// Resolves once the connection is gone
    pub async fn disconnected(&self) {
        self.disconnected.cancelled().await
    }

    /// Call `method` on `hub`
    #[instrument(skip(self, args), fields(id))]
    pub async fn call_hub(
        &self,
        hub: &str,
        method: &str,
        args: Vec<Value>,
    ) -> BittrexResult<Value> {
        if !self.is_connected() {
            return Err(BittrexError::Disconnected);
        }

        let mut sink = self.sink.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::Span::current().record("id", id);

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };
        // The read task may have drained `pending` before the insert
        if !self.is_connected() {
            return Err(BittrexError::Disconnected);
        }

        let frame = serde_json::to_string(&HubInvocation {
            hub: hub.to_string(),
            method: method.to_string(),
            args,
            id,
        })?;
        debug!("Invoking hub method");

        sink.send(frame)
            .await
            .map_err(|e| BittrexError::call_failed(method, e.to_string()))?;

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(BittrexError::call_failed(method, message)),
            Ok(Err(_)) => Err(BittrexError::Disconnected),
            Err(_) => Err(BittrexError::CallTimeout {
                method: method.to_string(),
                timeout: self.call_timeout,
            }),
        }
    }

    /// Close the connection and wait for the read task to finish
    ///
    /// Safe to call more than once; only the first call does anything.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(hub = %self.hub, "Closing hub connection");

        // Wakes the read task, which fails every pending call
        self.disconnected.cancel();
        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Error closing hub socket");
            }
        }

        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            let _ = reader.await;
        }
    }
}

#[async_trait]
impl HubCaller for HubConnection {
    async fn call(&self, method: &str, args: Vec<Value>) -> BittrexResult<Value> {
        self.call_hub(&self.hub, method, args).await
    }
}

impl Drop for HubConnection {
    fn drop(&mut self) {
        self.disconnected.cancel();
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}

impl std::fmt::Debug for HubConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConnection")
            .field("hub", &self.hub)
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

async fn read_loop(
    mut stream: FrameStream,
    handler: Arc<dyn FrameHandler>,
    pending: Arc<PendingCalls>,
    disconnected: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = disconnected.cancelled() => break,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(text)) => route_frame(&text, handler.as_ref(), &pending),
            Some(Err(e)) => {
                warn!(error = %e, "Hub connection failed");
                handler.on_error(&e);
                break;
            }
            None => {
                info!("Hub connection closed by server");
                break;
            }
        }
    }

    disconnected.cancel();
    // Dropping the senders fails every waiting call with `Disconnected`
    pending.clear();
}

fn route_frame(text: &str, handler: &dyn FrameHandler, pending: &PendingCalls) {
    match parse_frame(text) {
        Ok(ServerFrame::Response(response)) => match pending.remove(&response.id) {
            Some((_, tx)) => {
                let outcome = match response.error {
                    Some(message) => Err(message),
                    None => Ok(response.result),
                };
                let _ = tx.send(outcome);
            }
            None => debug!(id = response.id, "Result for unknown invocation"),
        },
        Ok(ServerFrame::Push(frames)) => {
            for frame in frames {
                handler.on_frame(frame);
            }
        }
        Ok(ServerFrame::KeepAlive) => trace!("Keep-alive"),
        Ok(ServerFrame::Other) => trace!(frame = %text, "Ignoring frame"),
        Err(e) => debug!(error = %e, "Unparseable hub frame"),
    }
}
