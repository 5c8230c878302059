//! API endpoint implementations

pub mod account;
pub mod market;
pub mod trading;

pub use account::AccountEndpoints;
pub use market::MarketEndpoints;
pub use trading::TradingEndpoints;

use crate::error::{RestError, RestResult};
use bittrex_auth::{Credentials, RequestSigner};
use bittrex_types::MarketSymbol;
use reqwest::{Client, Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Full URL for `path`, with `query` encoded when it has any fields
pub(crate) fn endpoint_url<Q: Serialize>(
    base_url: &str,
    path: &str,
    query: Option<&Q>,
) -> RestResult<String> {
    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);
    if let Some(query) = query {
        let encoded = serde_urlencoded::to_string(query)
            .map_err(|e| RestError::InvalidParameter(e.to_string()))?;
        if !encoded.is_empty() {
            url.push('?');
            url.push_str(&encoded);
        }
    }
    Ok(url)
}

/// Unsigned GET
pub(crate) fn public_request(client: &Client, url: &str) -> RestResult<Request> {
    Ok(client
        .get(url)
        .header("Accept", "application/json")
        .build()?)
}

/// Request carrying the v3 signature headers
///
/// The signature covers the exact URL and body sent, so both are fixed
/// here before signing.
pub(crate) fn signed_request(
    client: &Client,
    credentials: &Credentials,
    method: Method,
    url: &str,
    body: Option<String>,
) -> RestResult<Request> {
    let body = body.unwrap_or_default();
    let signed = RequestSigner::new(credentials).sign(url, method.as_str(), &body);

    let mut builder = client
        .request(method, url)
        .header("Accept", "application/json")
        .header("Api-Key", signed.api_key)
        .header("Api-Timestamp", signed.timestamp)
        .header("Api-Content-Hash", signed.content_hash)
        .header("Api-Signature", signed.signature);
    if !body.is_empty() {
        builder = builder
            .header("Content-Type", "application/json")
            .body(body);
    }
    Ok(builder.build()?)
}

/// Send `request` and decode its JSON body
pub(crate) async fn execute<T: DeserializeOwned>(client: &Client, request: Request) -> RestResult<T> {
    debug!(method = %request.method(), url = %request.url(), "Sending request");
    let response = client.execute(request).await?;
    let status = response.status();
    let body = response.bytes().await?;
    parse_body(status, &body)
}

pub(crate) fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> RestResult<T> {
    if !status.is_success() {
        return Err(RestError::from_response(status, body));
    }
    serde_json::from_slice(body).map_err(|e| RestError::Parse(e.to_string()))
}

/// Validate and upper-case a market name
pub(crate) fn market_symbol(market: &str) -> RestResult<MarketSymbol> {
    market
        .parse()
        .map_err(|e| RestError::InvalidParameter(format!("market {:?}: {}", market, e)))
}

/// Reject empty or path-breaking ids
pub(crate) fn resource_id<'a>(kind: &str, id: &'a str) -> RestResult<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') || id.contains('?') {
        return Err(RestError::InvalidParameter(format!("invalid {} id {:?}", kind, id)));
    }
    Ok(id)
}
