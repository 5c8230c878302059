//! Session supervisor: connect, authenticate, subscribe, stream, close

use crate::auth::{AuthScheme, Authenticator};
use crate::dispatcher::{DispatchStats, EventDispatcher};
use crate::endpoint::Endpoint;
use crate::events::{AuthState, SessionEnd, SessionState, StreamEvent};
use crate::hub::{ConnectOptions, FrameHandler, HubConnection};
use crate::retry::RetryPolicy;
use crate::subscription::{Subscription, SubscriptionManager};
use crate::transport::{SignalrTransport, Transport};
use bittrex_auth::Credentials;
use bittrex_types::{BittrexError, BittrexResult, MarketSymbol};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default hub name
pub const DEFAULT_HUB: &str = "CoreHub";

/// Configuration for streaming sessions
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Hub endpoint
    pub endpoint: Endpoint,
    /// Hub name
    pub hub: String,
    /// Connect deadline for market-data sessions
    pub market_connect_timeout: Duration,
    /// Connect deadline for order sessions
    pub order_connect_timeout: Duration,
    /// Per-call deadline
    pub call_timeout: Duration,
    /// Periodic re-authentication for order sessions
    pub reauth_interval: Duration,
    /// How challenges are obtained
    pub auth_scheme: AuthScheme,
    /// Connect retries at session start
    pub retry: RetryPolicy,
    /// Credentials for order sessions
    pub credentials: Option<Arc<Credentials>>,
    /// Delivery channel capacity used by [`StreamClient`]
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Production,
            hub: DEFAULT_HUB.to_string(),
            market_connect_timeout: Duration::from_secs(5),
            order_connect_timeout: Duration::from_secs(15),
            call_timeout: Duration::from_secs(10),
            reauth_interval: Duration::from_secs(8 * 60),
            auth_scheme: AuthScheme::default(),
            retry: RetryPolicy::default(),
            credentials: None,
            channel_capacity: 1024,
        }
    }
}

impl StreamConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the hub name
    pub fn with_hub(mut self, hub: impl Into<String>) -> Self {
        self.hub = hub.into();
        self
    }

    /// Set the market-data connect deadline
    pub fn with_market_connect_timeout(mut self, timeout: Duration) -> Self {
        self.market_connect_timeout = timeout;
        self
    }

    /// Set the order-session connect deadline
    pub fn with_order_connect_timeout(mut self, timeout: Duration) -> Self {
        self.order_connect_timeout = timeout;
        self
    }

    /// Set the per-call deadline
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the re-authentication interval
    pub fn with_reauth_interval(mut self, interval: Duration) -> Self {
        self.reauth_interval = interval;
        self
    }

    /// Set the authentication scheme
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Disable connect retries
    pub fn without_retry(mut self) -> Self {
        self.retry = RetryPolicy::disabled();
        self
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Set the delivery channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

/// Market channels a market-data session subscribes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketFeed {
    /// Market
    pub market: MarketSymbol,
    /// Ticker channel
    pub ticker: bool,
    /// 25-level orderbook channel
    pub orderbook: bool,
    /// Exchange deltas plus initial snapshot
    pub exchange_deltas: bool,
}

impl MarketFeed {
    /// Ticker and orderbook for `market`
    pub fn new(market: MarketSymbol) -> Self {
        Self {
            market,
            ticker: true,
            orderbook: true,
            exchange_deltas: false,
        }
    }

    /// Toggle the ticker channel
    pub fn with_ticker(mut self, enabled: bool) -> Self {
        self.ticker = enabled;
        self
    }

    /// Toggle the orderbook channel
    pub fn with_orderbook(mut self, enabled: bool) -> Self {
        self.orderbook = enabled;
        self
    }

    /// Toggle exchange deltas
    pub fn with_exchange_deltas(mut self, enabled: bool) -> Self {
        self.exchange_deltas = enabled;
        self
    }
}

/// What a session streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPlan {
    /// Public market data, no authentication
    Market(MarketFeed),
    /// Authenticated account order stream plus heartbeat
    Orders,
}

impl SessionPlan {
    /// Returns true if the session must authenticate
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Orders)
    }

    /// Connect deadline for this kind of session
    pub fn connect_timeout(&self, config: &StreamConfig) -> Duration {
        match self {
            Self::Market(_) => config.market_connect_timeout,
            Self::Orders => config.order_connect_timeout,
        }
    }

    /// Subscriptions the session issues
    pub fn subscriptions(&self) -> Vec<Subscription> {
        match self {
            Self::Market(feed) => {
                let mut subs = Vec::new();
                if feed.ticker {
                    subs.push(Subscription::Ticker(feed.market.clone()));
                }
                if feed.orderbook {
                    subs.push(Subscription::OrderBook(feed.market.clone()));
                }
                if feed.exchange_deltas {
                    subs.push(Subscription::ExchangeDeltas(feed.market.clone()));
                }
                subs
            }
            Self::Orders => vec![Subscription::Heartbeat, Subscription::Orders],
        }
    }
}

impl fmt::Display for SessionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market(feed) => write!(f, "market {}", feed.market),
            Self::Orders => f.write_str("orders"),
        }
    }
}

/// Drives one hub session from connect to close
///
/// ```text
/// Idle -> Connecting -> Authenticating -> Subscribing -> Streaming -> Closing -> Closed
///                                                  Streaming <-> Authenticating (re-auth)
/// ```
pub struct SessionSupervisor {
    config: StreamConfig,
    plan: SessionPlan,
    transport: Arc<dyn Transport>,
    authenticator: Option<Authenticator>,
    state: Arc<RwLock<SessionState>>,
    auth_state: Arc<RwLock<AuthState>>,
    subscriptions: Arc<SubscriptionManager>,
    stats: Arc<DispatchStats>,
}

impl SessionSupervisor {
    /// Create a supervisor that talks to the configured endpoint
    pub fn new(config: StreamConfig, plan: SessionPlan) -> BittrexResult<Self> {
        let transport = SignalrTransport::new(config.endpoint.clone(), config.call_timeout)
            .map_err(|e| BittrexError::Configuration(e.to_string()))?;
        Self::with_transport(config, plan, Arc::new(transport))
    }

    /// Create a supervisor over a custom transport
    pub fn with_transport(
        config: StreamConfig,
        plan: SessionPlan,
        transport: Arc<dyn Transport>,
    ) -> BittrexResult<Self> {
        if config.hub.trim().is_empty() {
            return Err(BittrexError::Configuration("hub name is empty".into()));
        }

        let authenticator = if plan.requires_auth() {
            let credentials = config.credentials.clone().ok_or_else(|| {
                BittrexError::Configuration("order sessions require credentials".into())
            })?;
            Some(Authenticator::new(config.auth_scheme, credentials))
        } else {
            None
        };

        Ok(Self {
            config,
            plan,
            transport,
            authenticator,
            state: Arc::default(),
            auth_state: Arc::default(),
            subscriptions: Arc::default(),
            stats: Arc::default(),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Current authentication state
    pub fn auth_state(&self) -> AuthState {
        *self.auth_state.read()
    }

    /// Delivery counters
    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// Acknowledged subscriptions
    pub fn subscriptions(&self) -> Arc<SubscriptionManager> {
        self.subscriptions.clone()
    }

    /// What this session streams
    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Run the session until `stop` fires or the hub disconnects
    ///
    /// Establishment failures (connect, authentication, subscription) are
    /// returned as errors. The connection is closed on every path.
    #[instrument(skip_all, fields(plan = %self.plan))]
    pub async fn run(
        &self,
        events: mpsc::Sender<StreamEvent>,
        stop: CancellationToken,
    ) -> BittrexResult<SessionEnd> {
        let session = stop.child_token();
        let result = self.run_session(events, &session).await;

        session.cancel();
        self.subscriptions.clear();
        self.set_state(SessionState::Closed);
        match &result {
            Ok(end) => info!(?end, "Session ended"),
            Err(e) => warn!(error = %e, "Session failed"),
        }
        result
    }

    async fn run_session(
        &self,
        events: mpsc::Sender<StreamEvent>,
        session: &CancellationToken,
    ) -> BittrexResult<SessionEnd> {
        self.set_state(SessionState::Connecting);

        let auth_expiring = Arc::new(Notify::new());
        let dispatcher = Arc::new(EventDispatcher::new(
            self.config.hub.clone(),
            events,
            auth_expiring.clone(),
            self.stats.clone(),
        ));

        let connection = tokio::select! {
            biased;
            _ = session.cancelled() => {
                info!("Stopped before the connection was established");
                return Ok(SessionEnd::Stopped);
            }
            connection = self.connect_with_retry(dispatcher.clone()) => Arc::new(connection?),
        };

        let refresher = Mutex::new(None);
        let outcome = tokio::select! {
            biased;
            _ = session.cancelled() => Ok(SessionEnd::Stopped),
            outcome = self.establish_and_stream(&connection, &dispatcher, &auth_expiring, session, &refresher) => outcome,
        };

        self.set_state(SessionState::Closing);
        session.cancel();
        connection.close().await;
        let refresher = refresher.lock().take();
        if let Some(refresher) = refresher {
            let _ = refresher.await;
        }

        outcome
    }

    async fn connect_with_retry(
        &self,
        dispatcher: Arc<EventDispatcher>,
    ) -> BittrexResult<HubConnection> {
        let options = ConnectOptions {
            connect_timeout: self.plan.connect_timeout(&self.config),
            call_timeout: self.config.call_timeout,
        };
        let handler: Arc<dyn FrameHandler> = dispatcher;

        self.config
            .retry
            .run(|| {
                HubConnection::connect(
                    self.transport.clone(),
                    &self.config.hub,
                    handler.clone(),
                    options,
                )
            })
            .await
    }

    async fn establish_and_stream(
        &self,
        connection: &Arc<HubConnection>,
        dispatcher: &EventDispatcher,
        auth_expiring: &Arc<Notify>,
        session: &CancellationToken,
        refresher: &Mutex<Option<JoinHandle<()>>>,
    ) -> BittrexResult<SessionEnd> {
        if let Some(auth) = &self.authenticator {
            self.set_state(SessionState::Authenticating);
            auth.authenticate(connection.as_ref()).await?;
            auth.verify(connection.as_ref()).await?;
            *self.auth_state.write() = AuthState::Authenticated;
        }

        self.set_state(SessionState::Subscribing);
        let snapshots = self
            .subscriptions
            .subscribe(connection.as_ref(), &self.plan.subscriptions())
            .await?;
        for snapshot in snapshots {
            dispatcher.deliver(StreamEvent::ExchangeState(snapshot));
        }

        self.set_state(SessionState::Streaming);
        info!(hub = %self.config.hub, "Streaming");

        if let Some(auth) = &self.authenticator {
            let task = ReauthTask {
                connection: connection.clone(),
                authenticator: auth.clone(),
                interval: self.config.reauth_interval,
                expiring: auth_expiring.clone(),
                session: session.clone(),
                state: self.state.clone(),
                auth_state: self.auth_state.clone(),
            };
            *refresher.lock() = Some(tokio::spawn(task.run()));
        }

        connection.disconnected().await;
        Ok(SessionEnd::Disconnected)
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.state.write();
        if *current != state {
            debug!(from = %*current, to = %state, "Session state");
            *current = state;
        }
    }
}

impl fmt::Debug for SessionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSupervisor")
            .field("plan", &self.plan)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Re-authenticates an order session on a timer or when the hub warns
struct ReauthTask {
    connection: Arc<HubConnection>,
    authenticator: Authenticator,
    interval: Duration,
    expiring: Arc<Notify>,
    session: CancellationToken,
    state: Arc<RwLock<SessionState>>,
    auth_state: Arc<RwLock<AuthState>>,
}

impl ReauthTask {
    async fn run(self) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let trigger = tokio::select! {
                biased;
                _ = self.session.cancelled() => break,
                _ = self.expiring.notified() => {
                    *self.auth_state.write() = AuthState::Expired;
                    "expiry notice"
                }
                _ = ticker.tick() => "interval",
            };

            self.transition(SessionState::Streaming, SessionState::Authenticating);
            let result = tokio::select! {
                biased;
                _ = self.session.cancelled() => break,
                result = self.authenticator.authenticate(self.connection.as_ref()) => result,
            };

            match result {
                Ok(()) => {
                    *self.auth_state.write() = AuthState::Authenticated;
                    debug!(trigger, "Re-authenticated");
                }
                Err(e) => {
                    *self.auth_state.write() = AuthState::Expired;
                    warn!(trigger, error = %e, "Re-authentication failed, will retry on next trigger");
                }
            }
            self.transition(SessionState::Authenticating, SessionState::Streaming);
        }
    }

    fn transition(&self, from: SessionState, to: SessionState) {
        let mut state = self.state.write();
        if *state == from {
            *state = to;
        }
    }
}

/// Running session spawned by [`StreamClient`]
pub struct SessionHandle {
    events: Option<mpsc::Receiver<StreamEvent>>,
    stop: CancellationToken,
    stats: Arc<DispatchStats>,
    task: JoinHandle<BittrexResult<SessionEnd>>,
}

impl SessionHandle {
    /// Take the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<StreamEvent>> {
        self.events.take()
    }

    /// Receive the next event, if the receiver was not taken
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Token that stops the session
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Request the session to stop
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Delivery counters
    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Wait for the session to finish
    pub async fn join(self) -> BittrexResult<SessionEnd> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(BittrexError::Configuration(format!("session task failed: {}", e))),
        }
    }
}

/// Entry point for market and order streams
#[derive(Clone)]
pub struct StreamClient {
    config: StreamConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl StreamClient {
    /// Create a client for the configured endpoint
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: StreamConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport: Some(transport),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Build a supervisor for `plan`
    pub fn supervisor(&self, plan: SessionPlan) -> BittrexResult<SessionSupervisor> {
        match &self.transport {
            Some(transport) => {
                SessionSupervisor::with_transport(self.config.clone(), plan, transport.clone())
            }
            None => SessionSupervisor::new(self.config.clone(), plan),
        }
    }

    /// Stream market data for `feed` into `events` until `stop` fires
    pub async fn subscribe_updates(
        &self,
        feed: MarketFeed,
        events: mpsc::Sender<StreamEvent>,
        stop: CancellationToken,
    ) -> BittrexResult<SessionEnd> {
        self.supervisor(SessionPlan::Market(feed))?
            .run(events, stop)
            .await
    }

    /// Stream account order updates into `events` until `stop` fires
    pub async fn subscribe_order_updates(
        &self,
        events: mpsc::Sender<StreamEvent>,
        stop: CancellationToken,
    ) -> BittrexResult<SessionEnd> {
        self.supervisor(SessionPlan::Orders)?.run(events, stop).await
    }

    /// Spawn a session for `plan` on the runtime
    pub fn spawn(&self, plan: SessionPlan) -> BittrexResult<SessionHandle> {
        let supervisor = self.supervisor(plan)?;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let stop = CancellationToken::new();
        let stats = supervisor.stats();

        let task = tokio::spawn({
            let stop = stop.clone();
            async move { supervisor.run(tx, stop).await }
        });

        Ok(SessionHandle {
            events: Some(rx),
            stop,
            stats,
            task,
        })
    }
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("config", &self.config)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}
