//! Hub authentication challenges

use crate::credentials::Credentials;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Anything that can answer a hub challenge with a hex digest
pub trait ChallengeSigner: Send + Sync {
    /// API key sent alongside the signature
    fn api_key(&self) -> &str;

    /// Sign the challenge text
    fn sign_challenge(&self, challenge: &str) -> String;
}

impl ChallengeSigner for Credentials {
    fn api_key(&self) -> &str {
        Credentials::api_key(self)
    }

    fn sign_challenge(&self, challenge: &str) -> String {
        self.sign(challenge)
    }
}

/// Locally generated challenge: epoch milliseconds plus a random UUID v4
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Epoch milliseconds
    pub timestamp: u64,
    /// Random nonce
    pub nonce: String,
}

impl Challenge {
    /// Fresh challenge stamped with the current time
    pub fn local() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self::new(timestamp, Uuid::new_v4().to_string())
    }

    /// Challenge with fixed parts
    pub fn new(timestamp: u64, nonce: impl Into<String>) -> Self {
        Self {
            timestamp,
            nonce: nonce.into(),
        }
    }

    /// Text that gets signed
    pub fn message(&self) -> String {
        format!("{}{}", self.timestamp, self.nonce)
    }
}
