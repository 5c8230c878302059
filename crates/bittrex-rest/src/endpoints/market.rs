//! Public market data endpoints
//!
//! These endpoints don't require authentication.

use super::{endpoint_url, execute, market_symbol, public_request};
use crate::error::{RestError, RestResult};
use crate::types::{OrderBook, ORDERBOOK_DEPTHS};
use bittrex_types::{Market, Ticker};
use reqwest::{Client, Request};
use tracing::instrument;

/// Public market data endpoints
pub struct MarketEndpoints<'a> {
    client: &'a Client,
    base_url: &'a str,
}

impl<'a> MarketEndpoints<'a> {
    pub fn new(client: &'a Client, base_url: &'a str) -> Self {
        Self { client, base_url }
    }

    /// Get every listed market
    #[instrument(skip(self))]
    pub async fn get_markets(&self) -> RestResult<Vec<Market>> {
        let request = self.markets_request()?;
        execute(self.client, request).await
    }

    /// Get one market's definition
    #[instrument(skip(self))]
    pub async fn get_market(&self, market: &str) -> RestResult<Market> {
        let symbol = market_symbol(market)?;
        let url = endpoint_url::<()>(self.base_url, &format!("/markets/{}", symbol), None)?;
        execute(self.client, public_request(self.client, &url)?).await
    }

    /// Get ticker information
    ///
    /// # Arguments
    /// * `market` - Market symbol (e.g., "ETH-BTC"), any case
    #[instrument(skip(self))]
    pub async fn get_ticker(&self, market: &str) -> RestResult<Ticker> {
        let request = self.ticker_request(market)?;
        execute(self.client, request).await
    }

    /// Get orderbook depth
    ///
    /// # Arguments
    /// * `market` - Market symbol
    /// * `depth` - Levels per side: 1, 25 or 500 (default 25)
    #[instrument(skip(self))]
    pub async fn get_orderbook(&self, market: &str, depth: Option<u32>) -> RestResult<OrderBook> {
        let request = self.orderbook_request(market, depth)?;
        execute(self.client, request).await
    }

    fn markets_request(&self) -> RestResult<Request> {
        let url = endpoint_url::<()>(self.base_url, "/markets", None)?;
        public_request(self.client, &url)
    }

    fn ticker_request(&self, market: &str) -> RestResult<Request> {
        let symbol = market_symbol(market)?;
        let url = endpoint_url::<()>(self.base_url, &format!("/markets/{}/ticker", symbol), None)?;
        public_request(self.client, &url)
    }

    fn orderbook_request(&self, market: &str, depth: Option<u32>) -> RestResult<Request> {
        let symbol = market_symbol(market)?;
        let depth = depth.unwrap_or(25);
        if !ORDERBOOK_DEPTHS.contains(&depth) {
            return Err(RestError::InvalidParameter(format!(
                "depth must be one of {:?}, got {}",
                ORDERBOOK_DEPTHS, depth
            )));
        }

        let query = [("depth", depth)];
        let url = endpoint_url(
            self.base_url,
            &format!("/markets/{}/orderbook", symbol),
            Some(&query),
        )?;
        public_request(self.client, &url)
    }
}
