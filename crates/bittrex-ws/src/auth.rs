//! Hub authentication with signed challenges

use crate::hub::HubCaller;
use bittrex_auth::{Challenge, ChallengeSigner};
use bittrex_types::{BittrexError, BittrexResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Where the signed challenge comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// Sign `timestamp + uuid` generated locally, then
    /// `Authenticate(apiKey, timestamp, uuid, signature)`
    #[default]
    LocalTimestamp,
    /// Fetch a challenge with `GetAuthContext(apiKey)`, then
    /// `Authenticate(apiKey, signature)`
    ServerChallenge,
}

/// Signs hub challenges and submits them
#[derive(Clone)]
pub struct Authenticator {
    scheme: AuthScheme,
    signer: Arc<dyn ChallengeSigner>,
}

impl Authenticator {
    /// Create an authenticator
    pub fn new(scheme: AuthScheme, signer: Arc<dyn ChallengeSigner>) -> Self {
        Self { scheme, signer }
    }

    /// Scheme in use
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Run the challenge exchange
    ///
    /// Any failure, including a failed call, comes back as
    /// `AuthenticationFailed`.
    #[instrument(skip_all, fields(scheme = ?self.scheme))]
    pub async fn authenticate(&self, caller: &dyn HubCaller) -> BittrexResult<()> {
        let api_key = self.signer.api_key().to_string();

        let response = match self.scheme {
            AuthScheme::LocalTimestamp => {
                let challenge = Challenge::local();
                let signature = self.signer.sign_challenge(&challenge.message());
                caller
                    .call(
                        "Authenticate",
                        vec![
                            json!(api_key),
                            json!(challenge.timestamp),
                            json!(challenge.nonce),
                            json!(signature),
                        ],
                    )
                    .await
            }
            AuthScheme::ServerChallenge => {
                let context = caller
                    .call("GetAuthContext", vec![json!(api_key)])
                    .await
                    .map_err(|e| failed_call("GetAuthContext", e))?;
                let challenge = context.as_str().ok_or_else(|| {
                    BittrexError::auth(format!("GetAuthContext returned {}", context))
                })?;
                let signature = self.signer.sign_challenge(challenge);
                caller
                    .call("Authenticate", vec![json!(api_key), json!(signature)])
                    .await
            }
        }
        .map_err(|e| failed_call("Authenticate", e))?;

        check_response(&response)?;
        info!("Authenticated");
        Ok(())
    }

    /// Ask the hub whether the session is authenticated
    ///
    /// Only an explicit `false` fails; hubs that answer with nothing are
    /// taken at their word.
    pub async fn verify(&self, caller: &dyn HubCaller) -> BittrexResult<()> {
        let response = caller
            .call("IsAuthenticated", Vec::new())
            .await
            .map_err(|e| failed_call("IsAuthenticated", e))?;
        debug!(%response, "IsAuthenticated");

        if response == Value::Bool(false) {
            return Err(BittrexError::auth("hub reports the session is not authenticated"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

fn failed_call(method: &str, err: BittrexError) -> BittrexError {
    match err {
        BittrexError::AuthenticationFailed { .. } => err,
        other => BittrexError::auth(format!("{} failed: {}", method, other)),
    }
}

/// `Authenticate` answers `true`, `null`, or `{"Success":bool,"ErrorCode":..}`
fn check_response(response: &Value) -> BittrexResult<()> {
    match response {
        Value::Bool(false) => Err(BittrexError::auth("hub rejected the signature")),
        Value::Object(obj) => {
            let success = obj
                .get("Success")
                .or_else(|| obj.get("success"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if success {
                Ok(())
            } else {
                let code = obj
                    .get("ErrorCode")
                    .or_else(|| obj.get("errorCode"))
                    .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
                    .unwrap_or_else(|| "no error code".to_string());
                Err(BittrexError::auth(format!("hub rejected the signature: {}", code)))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bittrex_auth::Credentials;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedCaller {
        replies: Mutex<VecDeque<BittrexResult<Value>>>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl ScriptedCaller {
        fn new(replies: Vec<BittrexResult<Value>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl HubCaller for ScriptedCaller {
        async fn call(&self, method: &str, args: Vec<Value>) -> BittrexResult<Value> {
            self.calls.lock().push((method.to_string(), args));
            self.replies
                .lock()
                .pop_front()
                .unwrap_or(Err(BittrexError::Disconnected))
        }
    }

    fn creds() -> Arc<Credentials> {
        Arc::new(Credentials::new("my-key", "my-secret").unwrap())
    }

    #[tokio::test]
    async fn test_local_timestamp_arguments() {
        let creds = creds();
        let auth = Authenticator::new(AuthScheme::LocalTimestamp, creds.clone());
        let caller = ScriptedCaller::new(vec![Ok(json!({"Success": true, "ErrorCode": null}))]);

        auth.authenticate(&caller).await.unwrap();

        let calls = caller.calls.lock();
        let (method, args) = &calls[0];
        assert_eq!(method, "Authenticate");
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], json!("my-key"));

        let timestamp = args[1].as_u64().unwrap();
        let nonce = args[2].as_str().unwrap();
        let expected = creds.sign(&format!("{}{}", timestamp, nonce));
        assert_eq!(args[3], json!(expected));
    }

    #[tokio::test]
    async fn test_server_challenge() {
        let creds = creds();
        let auth = Authenticator::new(AuthScheme::ServerChallenge, creds.clone());
        let caller = ScriptedCaller::new(vec![Ok(json!("challenge-text")), Ok(json!(true))]);

        auth.authenticate(&caller).await.unwrap();

        let calls = caller.calls.lock();
        assert_eq!(calls[0].0, "GetAuthContext");
        assert_eq!(calls[0].1, vec![json!("my-key")]);
        assert_eq!(calls[1].0, "Authenticate");
        assert_eq!(
            calls[1].1,
            vec![json!("my-key"), json!(creds.sign("challenge-text"))]
        );
    }

    #[tokio::test]
    async fn test_rejections() {
        let auth = Authenticator::new(AuthScheme::LocalTimestamp, creds());

        for reply in [
            Ok(json!(false)),
            Ok(json!({"Success": false, "ErrorCode": "INVALID_SIGNATURE"})),
            Err(BittrexError::CallTimeout {
                method: "Authenticate".into(),
                timeout: std::time::Duration::from_secs(1),
            }),
        ] {
            let caller = ScriptedCaller::new(vec![reply]);
            let err = auth.authenticate(&caller).await.unwrap_err();
            assert!(err.requires_reauth(), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_null_response_accepted() {
        let auth = Authenticator::new(AuthScheme::LocalTimestamp, creds());
        let caller = ScriptedCaller::new(vec![Ok(Value::Null)]);
        assert!(auth.authenticate(&caller).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify() {
        let auth = Authenticator::new(AuthScheme::LocalTimestamp, creds());

        let caller = ScriptedCaller::new(vec![Ok(json!(true))]);
        assert!(auth.verify(&caller).await.is_ok());

        let caller = ScriptedCaller::new(vec![Ok(json!(false))]);
        assert!(matches!(
            auth.verify(&caller).await,
            Err(BittrexError::AuthenticationFailed { .. })
        ));
    }
}
