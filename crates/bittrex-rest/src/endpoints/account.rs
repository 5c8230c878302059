//! Private account endpoints
//!
//! These endpoints require authentication.

use super::{endpoint_url, execute, market_symbol, resource_id, signed_request};
use crate::error::RestResult;
use crate::types::MarketQuery;
use bittrex_auth::Credentials;
use bittrex_types::{Balance, MarketSymbol, Order};
use reqwest::{Client, Method, Request};
use tracing::instrument;

/// Private account endpoints
pub struct AccountEndpoints<'a> {
    client: &'a Client,
    base_url: &'a str,
    credentials: &'a Credentials,
}

impl<'a> AccountEndpoints<'a> {
    pub fn new(client: &'a Client, base_url: &'a str, credentials: &'a Credentials) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    fn get(&self, path: &str, market: Option<&MarketSymbol>) -> RestResult<Request> {
        let query = MarketQuery {
            market_symbol: market.map(MarketSymbol::as_str),
        };
        let url = endpoint_url(self.base_url, path, Some(&query))?;
        signed_request(self.client, self.credentials, Method::GET, &url, None)
    }

    /// Get every currency balance
    #[instrument(skip(self))]
    pub async fn get_balances(&self) -> RestResult<Vec<Balance>> {
        execute(self.client, self.get("/balances", None)?).await
    }

    /// Get the balance of one currency
    #[instrument(skip(self))]
    pub async fn get_balance(&self, currency: &str) -> RestResult<Balance> {
        let currency = resource_id("currency", currency)?.to_ascii_uppercase();
        execute(self.client, self.get(&format!("/balances/{}", currency), None)?).await
    }

    /// Get open orders, optionally for one market
    #[instrument(skip(self))]
    pub async fn get_open_orders(&self, market: Option<&str>) -> RestResult<Vec<Order>> {
        execute(self.client, self.open_orders_request(market)?).await
    }

    /// Get one order by id
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> RestResult<Order> {
        let id = resource_id("order", order_id)?;
        execute(self.client, self.get(&format!("/orders/{}", id), None)?).await
    }

    /// Get closed orders, optionally for one market
    #[instrument(skip(self))]
    pub async fn get_order_history(&self, market: Option<&str>) -> RestResult<Vec<Order>> {
        let market = market.map(market_symbol).transpose()?;
        execute(self.client, self.get("/orders/closed", market.as_ref())?).await
    }

    fn open_orders_request(&self, market: Option<&str>) -> RestResult<Request> {
        let market = market.map(market_symbol).transpose()?;
        self.get("/orders/open", market.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_orders_query() {
        let client = Client::new();
        let creds = Credentials::new("key", "secret").unwrap();
        let account = AccountEndpoints::new(&client, "https://api.bittrex.com/v3", &creds);

        let request = account.open_orders_request(Some("ltc-btc")).unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://api.bittrex.com/v3/orders/open?marketSymbol=LTC-BTC"
        );
        assert_eq!(request.method(), Method::GET);
        assert!(request.headers().contains_key("Api-Signature"));

        let request = account.open_orders_request(None).unwrap();
        assert_eq!(request.url().query(), None);
    }
}
