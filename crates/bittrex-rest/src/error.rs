//! Error types for REST API operations

use bittrex_auth::AuthError;
use serde::Deserialize;

/// Errors that can occur during REST API operations
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing API credentials for private endpoint
    #[error("Authentication required for this endpoint")]
    AuthRequired,

    /// Credentials could not be loaded
    #[error("Credentials error: {0}")]
    Credentials(#[from] AuthError),

    /// API answered with a non-success status
    #[error("API error {status}: {code}")]
    Api {
        /// HTTP status
        status: u16,
        /// Error code from the response body, or the status reason
        code: String,
        /// Optional detail message
        detail: Option<String>,
    },

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Error body returned by v3 on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    detail: Option<String>,
}

impl RestError {
    /// Build an API error from a non-success response body
    ///
    /// Bodies without a `code` fall back to the status text.
    pub fn from_response(status: reqwest::StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status: status.as_u16(),
                code: parsed.code,
                detail: parsed.detail,
            },
            Err(_) => Self::Api {
                status: status.as_u16(),
                code: status
                    .canonical_reason()
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                detail: None,
            },
        }
    }

    /// Error code for API errors
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if the request hit the client timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this error indicates rate limiting
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }
}

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_api_error_from_body() {
        let body = br#"{"code":"INSUFFICIENT_FUNDS","detail":"not enough BTC"}"#;
        let err = RestError::from_response(StatusCode::CONFLICT, body);
        assert_eq!(err.code(), Some("INSUFFICIENT_FUNDS"));
        assert!(!err.is_retryable());
        assert!(matches!(err, RestError::Api { status: 409, detail: Some(_), .. }));
    }

    #[test]
    fn test_api_error_without_body() {
        let err = RestError::from_response(StatusCode::SERVICE_UNAVAILABLE, b"<html>");
        assert_eq!(err.code(), Some("Service Unavailable"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rate_limited() {
        let err = RestError::from_response(StatusCode::TOO_MANY_REQUESTS, br#"{"code":"THROTTLED"}"#);
        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
        assert!(!RestError::AuthRequired.is_retryable());
    }
}
