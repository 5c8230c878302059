//! Credentials and request signing for Bittrex
//!
//! Both the streaming hub and the v3 REST API authenticate with an
//! HMAC-SHA512 digest keyed by the API secret, hex encoded. This crate holds
//! the secret and produces those digests.
//!
//! # Example
//!
//! ```no_run
//! use bittrex_auth::{Challenge, Credentials};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let creds = Credentials::from_env()?;
//!
//! // Locally generated hub challenge: timestamp followed by a random UUID
//! let challenge = Challenge::local();
//! let signature = creds.sign(&challenge.message());
//! assert_eq!(signature.len(), 128);
//! # Ok(())
//! # }
//! ```

mod challenge;
mod credentials;
mod error;

pub use challenge::{Challenge, ChallengeSigner};
pub use credentials::{sha512_hex, Credentials, RequestSigner, SignedRequest};
pub use error::{AuthError, AuthResult};
