//! Trading endpoints for order management
//!
//! These endpoints require authentication.

use super::{endpoint_url, execute, market_symbol, resource_id, signed_request};
use crate::error::{RestError, RestResult};
use crate::types::NewOrder;
use bittrex_auth::Credentials;
use bittrex_types::{Direction, Order, TimeInForce};
use reqwest::{Client, Method, Request};
use rust_decimal::Decimal;
use tracing::{info, instrument};

/// Trading endpoints for order management
pub struct TradingEndpoints<'a> {
    client: &'a Client,
    base_url: &'a str,
    credentials: &'a Credentials,
}

impl<'a> TradingEndpoints<'a> {
    pub fn new(client: &'a Client, base_url: &'a str, credentials: &'a Credentials) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    /// Place an order
    #[instrument(skip(self, order), fields(market = %order.market_symbol, direction = ?order.direction))]
    pub async fn place_order(&self, order: &NewOrder) -> RestResult<Order> {
        let placed: Order = execute(self.client, self.place_request(order)?).await?;
        info!(order_id = %placed.id, "Order placed");
        Ok(placed)
    }

    /// Place a limit order
    pub async fn limit_order(
        &self,
        market: &str,
        direction: Direction,
        quantity: Decimal,
        rate: Decimal,
        time_in_force: TimeInForce,
    ) -> RestResult<Order> {
        let order = NewOrder::limit(market_symbol(market)?, direction, quantity, rate, time_in_force);
        self.place_order(&order).await
    }

    /// Cancel an order by id
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: &str) -> RestResult<Order> {
        execute(self.client, self.cancel_request(order_id)?).await
    }

    fn place_request(&self, order: &NewOrder) -> RestResult<Request> {
        order.validate().map_err(RestError::InvalidParameter)?;
        let body = serde_json::to_string(order).map_err(|e| RestError::InvalidParameter(e.to_string()))?;
        let url = endpoint_url::<()>(self.base_url, "/orders", None)?;
        signed_request(self.client, self.credentials, Method::POST, &url, Some(body))
    }

    fn cancel_request(&self, order_id: &str) -> RestResult<Request> {
        let id = resource_id("order", order_id)?;
        let url = endpoint_url::<()>(self.base_url, &format!("/orders/{}", id), None)?;
        signed_request(self.client, self.credentials, Method::DELETE, &url, None)
    }
}
