//! Error types for the Bittrex clients

use std::time::Duration;
use thiserror::Error;

/// Main error type for streaming operations
#[derive(Error, Debug)]
pub enum BittrexError {
    // === Connection Errors ===
    /// Hub handshake did not complete within the deadline
    #[error("Connection timeout after {timeout:?} to {url}")]
    ConnectionTimeout { url: String, timeout: Duration },

    /// Failed to establish the hub connection
    #[error("Failed to connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The connection closed while an operation was pending
    #[error("Hub connection closed")]
    Disconnected,

    // === Call Errors ===
    /// A hub call did not return within the deadline
    #[error("Hub call {method} timed out after {timeout:?}")]
    CallTimeout { method: String, timeout: Duration },

    /// A hub call failed at the transport or was answered with an error
    #[error("Hub call {method} failed: {reason}")]
    CallFailed { method: String, reason: String },

    // === Authentication Errors ===
    /// The hub rejected the credentials or the signing call failed
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    // === Subscription Errors ===
    /// One channel acknowledgement came back unsuccessful
    #[error("Subscription rejected for {channel}: {}", code.as_deref().unwrap_or("no error code"))]
    SubscriptionRejected {
        channel: String,
        code: Option<String>,
    },

    // === Protocol Errors ===
    /// A compressed payload could not be decoded
    #[error("Payload decode failed: {0}")]
    Decode(String),

    /// Failed to parse JSON message
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String, raw: Option<String> },

    // === Internal Errors ===
    /// Delivery channel was closed by the consumer
    #[error("Delivery channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BittrexError {
    /// Returns true if the supervisor may retry the failed operation at
    /// session start
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::ConnectionFailed { .. }
        )
    }

    /// Returns true if this is a deadline error (connect or call)
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectionTimeout { .. } | Self::CallTimeout { .. })
    }

    /// Returns true if this error requires re-authentication
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }

    /// Returns true if the session cannot continue after this error
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::InvalidJson { .. })
    }

    /// Error code carried by a rejected subscription
    pub fn subscription_code(&self) -> Option<&str> {
        match self {
            Self::SubscriptionRejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Create a subscription rejected error
    pub fn subscription_rejected(channel: impl Into<String>, code: Option<String>) -> Self {
        Self::SubscriptionRejected {
            channel: channel.into(),
            code,
        }
    }

    /// Create an authentication error
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            reason: reason.into(),
        }
    }

    /// Create a call failure
    pub fn call_failed(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CallFailed {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for BittrexError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson {
            message: err.to_string(),
            raw: None,
        }
    }
}

/// Result type alias for Bittrex operations
pub type BittrexResult<T> = Result<T, BittrexError>;
