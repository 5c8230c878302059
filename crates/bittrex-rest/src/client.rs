//! Main REST client implementation

use crate::endpoints::{AccountEndpoints, MarketEndpoints, TradingEndpoints};
use crate::error::{RestError, RestResult};
use crate::types::{NewOrder, OrderBook};
use bittrex_auth::Credentials;
use bittrex_types::{Balance, Direction, Market, Order, Ticker, TimeInForce};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;

/// v3 API root
pub const DEFAULT_BASE_URL: &str = "https://api.bittrex.com/v3";

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Bittrex v3 REST API client
///
/// Provides access to both public and private endpoints.
///
/// # Example
///
/// ```no_run
/// use bittrex_rest::{BittrexRestClient, Credentials};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Public endpoints only
///     let client = BittrexRestClient::new()?;
///     let ticker = client.get_ticker("ETH-BTC").await?;
///     println!("last {}", ticker.last_trade_rate);
///
///     // With authentication for private endpoints
///     let creds = Credentials::from_env()?;
///     let auth_client = BittrexRestClient::with_credentials(creds)?;
///     let balances = auth_client.get_balances().await?;
///     println!("{} balances", balances.len());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct BittrexRestClient {
    http_client: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl BittrexRestClient {
    /// Create a new client without authentication
    ///
    /// Only public endpoints will be available.
    pub fn new() -> RestResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with credentials
    ///
    /// All endpoints (public and private) will be available.
    pub fn with_credentials(credentials: Credentials) -> RestResult<Self> {
        Self::with_config(ClientConfig::new().with_credentials(credentials))
    }

    /// Create a client with credentials from `BITTREX_API_KEY` / `BITTREX_API_SECRET`
    pub fn from_env() -> RestResult<Self> {
        Self::with_credentials(Credentials::from_env()?)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> RestResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_deref().unwrap_or("bittrex-rest/0.1.0"))
            .build()?;

        info!(base_url = %config.base_url, "Created Bittrex REST client");

        Ok(Self {
            http_client,
            base_url: config.base_url,
            credentials: config.credentials,
        })
    }

    /// Check if the client has credentials for private endpoints
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// API root requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Public Market Endpoints
    // ========================================================================

    /// Get market endpoints
    pub fn market(&self) -> MarketEndpoints<'_> {
        MarketEndpoints::new(&self.http_client, &self.base_url)
    }

    /// Get every listed market
    pub async fn get_markets(&self) -> RestResult<Vec<Market>> {
        self.market().get_markets().await
    }

    /// Get ticker information for a market
    ///
    /// # Arguments
    /// * `market` - Market symbol (e.g., "ETH-BTC"), any case
    pub async fn get_ticker(&self, market: &str) -> RestResult<Ticker> {
        self.market().get_ticker(market).await
    }

    /// Get orderbook depth for a market
    ///
    /// # Arguments
    /// * `market` - Market symbol
    /// * `depth` - Levels per side (1, 25 or 500)
    pub async fn get_orderbook(&self, market: &str, depth: Option<u32>) -> RestResult<OrderBook> {
        self.market().get_orderbook(market, depth).await
    }

    // ========================================================================
    // Private Account Endpoints
    // ========================================================================

    /// Get account endpoints (requires credentials)
    pub fn account(&self) -> RestResult<AccountEndpoints<'_>> {
        let creds = self.credentials.as_ref().ok_or(RestError::AuthRequired)?;
        Ok(AccountEndpoints::new(&self.http_client, &self.base_url, creds))
    }

    /// Get every currency balance
    pub async fn get_balances(&self) -> RestResult<Vec<Balance>> {
        self.account()?.get_balances().await
    }

    /// Get open orders, optionally restricted to one market
    pub async fn get_open_orders(&self, market: Option<&str>) -> RestResult<Vec<Order>> {
        self.account()?.get_open_orders(market).await
    }

    /// Get one order by id
    pub async fn get_order(&self, order_id: &str) -> RestResult<Order> {
        self.account()?.get_order(order_id).await
    }

    /// Get closed orders, optionally restricted to one market
    pub async fn get_order_history(&self, market: Option<&str>) -> RestResult<Vec<Order>> {
        self.account()?.get_order_history(market).await
    }

    // ========================================================================
    // Private Trading Endpoints
    // ========================================================================

    /// Get trading endpoints (requires credentials)
    pub fn trading(&self) -> RestResult<TradingEndpoints<'_>> {
        let creds = self.credentials.as_ref().ok_or(RestError::AuthRequired)?;
        Ok(TradingEndpoints::new(&self.http_client, &self.base_url, creds))
    }

    /// Place a limit buy
    pub async fn buy_limit(
        &self,
        market: &str,
        time_in_force: TimeInForce,
        quantity: Decimal,
        rate: Decimal,
    ) -> RestResult<Order> {
        self.trading()?
            .limit_order(market, Direction::Buy, quantity, rate, time_in_force)
            .await
    }

    /// Place a limit sell
    pub async fn sell_limit(
        &self,
        market: &str,
        time_in_force: TimeInForce,
        quantity: Decimal,
        rate: Decimal,
    ) -> RestResult<Order> {
        self.trading()?
            .limit_order(market, Direction::Sell, quantity, rate, time_in_force)
            .await
    }

    /// Place an arbitrary new order
    pub async fn place_order(&self, order: &NewOrder) -> RestResult<Order> {
        self.trading()?.place_order(order).await
    }

    /// Cancel an order by id
    pub async fn cancel_order(&self, order_id: &str) -> RestResult<Order> {
        self.trading()?.cancel_order(order_id).await
    }
}

impl std::fmt::Debug for BittrexRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BittrexRestClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.has_credentials())
            .finish()
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API credentials (optional)
    pub credentials: Option<Credentials>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API root
    pub base_url: String,
    /// Custom user agent
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
