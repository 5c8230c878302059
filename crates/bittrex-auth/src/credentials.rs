//! API credentials and HMAC-SHA512 signing
//!
//! # Security
//!
//! The API secret is stored using the `secrecy` crate which:
//! - Zeroizes memory on drop
//! - Keeps the secret out of `Debug` output
//! - Requires explicit access via `expose_secret()`

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AuthError, AuthResult};

type HmacSha512 = Hmac<Sha512>;

/// API credentials for authenticated hub calls and REST requests
pub struct Credentials {
    /// API key (public)
    api_key: String,
    /// API secret bytes (zeroized on drop)
    api_secret: SecretBox<Vec<u8>>,
}

impl Credentials {
    /// Create credentials from an API key and secret
    ///
    /// Bittrex secrets are used as raw UTF-8 bytes for the HMAC key, not
    /// decoded first.
    pub fn new(api_key: impl Into<String>, api_secret: impl AsRef<str>) -> AuthResult<Self> {
        let api_key = api_key.into();
        let api_secret = api_secret.as_ref();

        if api_key.trim().is_empty() {
            return Err(AuthError::InvalidCredentials("API key is empty".to_string()));
        }
        if api_secret.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "API secret is empty".to_string(),
            ));
        }

        Ok(Self {
            api_key,
            api_secret: SecretBox::new(Box::new(api_secret.as_bytes().to_vec())),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Reads `BITTREX_API_KEY` and `BITTREX_API_SECRET` from the environment.
    pub fn from_env() -> AuthResult<Self> {
        let api_key = std::env::var("BITTREX_API_KEY")
            .map_err(|_| AuthError::EnvVarNotSet("BITTREX_API_KEY".to_string()))?;
        let api_secret = std::env::var("BITTREX_API_SECRET")
            .map_err(|_| AuthError::EnvVarNotSet("BITTREX_API_SECRET".to_string()))?;

        Self::new(api_key, api_secret)
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// HMAC-SHA512 of `message` keyed by the secret, lowercase hex
    pub fn sign(&self, message: &str) -> String {
        let mut mac = HmacSha512::new_from_slice(self.api_secret.expose_secret())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            api_secret: SecretBox::new(Box::new(self.api_secret.expose_secret().clone())),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "api_key",
                &format!("{}...", self.api_key.chars().take(8).collect::<String>()),
            )
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// SHA-512 of `body`, lowercase hex (the v3 `Api-Content-Hash` header)
pub fn sha512_hex(body: &str) -> String {
    hex::encode(Sha512::digest(body.as_bytes()))
}

/// Header values for one signed v3 REST request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// `Api-Key`
    pub api_key: String,
    /// `Api-Timestamp`, epoch milliseconds
    pub timestamp: String,
    /// `Api-Content-Hash`
    pub content_hash: String,
    /// `Api-Signature`
    pub signature: String,
}

/// Signs v3 REST requests
///
/// The pre-sign string is `timestamp + uri + method + contentHash`, where
/// `uri` is the full request URL including its query string.
#[derive(Debug)]
pub struct RequestSigner<'a> {
    credentials: &'a Credentials,
    timestamp: String,
}

impl<'a> RequestSigner<'a> {
    /// Create a signer stamped with the current time
    pub fn new(credentials: &'a Credentials) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self::with_timestamp(credentials, millis.to_string())
    }

    /// Create a signer with a fixed timestamp
    pub fn with_timestamp(credentials: &'a Credentials, timestamp: impl Into<String>) -> Self {
        Self {
            credentials,
            timestamp: timestamp.into(),
        }
    }

    /// Get the timestamp for this request
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Sign a request
    pub fn sign(&self, uri: &str, method: &str, body: &str) -> SignedRequest {
        let content_hash = sha512_hex(body);
        let presign = format!("{}{}{}{}", self.timestamp, uri, method, content_hash);

        SignedRequest {
            api_key: self.credentials.api_key().to_string(),
            timestamp: self.timestamp.clone(),
            signature: self.credentials.sign(&presign),
            content_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("test_api_key", "test_api_secret").unwrap()
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let debug = format!("{:?}", creds());
        assert!(!debug.contains("test_api_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credentials_debug_multibyte_key() {
        let creds = Credentials::new("ключ-ключ-ключ", "secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ключ-клю..."));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        assert!(Credentials::new("", "secret").is_err());
        assert!(Credentials::new("key", "").is_err());
    }

    #[test]
    fn test_sign_deterministic() {
        let creds = creds();
        let a = creds.sign("1585000000000abc");
        let b = creds.sign("1585000000000abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 128);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_sign_changes_with_input() {
        let creds = creds();
        assert_ne!(creds.sign("1585000000000abc"), creds.sign("1585000000000abd"));

        let other = Credentials::new("test_api_key", "test_api_secreu").unwrap();
        assert_ne!(creds.sign("payload"), other.sign("payload"));
    }

    #[test]
    fn test_known_hmac_vector() {
        // RFC 4231 test case 2
        let creds = Credentials::new("key", "Jefe").unwrap();
        assert_eq!(
            creds.sign("what do ya want for nothing?"),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn test_content_hash_of_empty_body() {
        assert_eq!(
            sha512_hex(""),
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn test_request_signer() {
        let creds = creds();
        let signer = RequestSigner::with_timestamp(&creds, "1585000000000");
        let signed = signer.sign("https://api.bittrex.com/v3/balances", "GET", "");

        assert_eq!(signed.api_key, "test_api_key");
        assert_eq!(signed.timestamp, "1585000000000");
        assert_eq!(signed.content_hash, sha512_hex(""));

        let expected = creds.sign(&format!(
            "1585000000000https://api.bittrex.com/v3/balancesGET{}",
            sha512_hex("")
        ));
        assert_eq!(signed.signature, expected);
    }

    #[test]
    fn test_request_signer_timestamp_is_millis() {
        let creds = creds();
        let signer = RequestSigner::new(&creds);
        assert_eq!(signer.timestamp().len(), 13);
        assert!(signer.timestamp().chars().all(|c| c.is_ascii_digit()));
    }
}
