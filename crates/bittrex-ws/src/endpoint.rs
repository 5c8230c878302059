//! Hub endpoint definitions and SignalR handshake URLs

use std::fmt;

/// SignalR classic protocol version spoken by the hub
pub const CLIENT_PROTOCOL: &str = "1.5";

/// Streaming hub endpoints
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// Production hub (default)
    #[default]
    Production,
    /// Any other host, e.g. a local test server
    Custom {
        /// Host with optional port
        host: String,
        /// Use https/wss instead of http/ws
        tls: bool,
    },
}

impl Endpoint {
    /// Custom TLS endpoint
    pub fn custom(host: impl Into<String>) -> Self {
        Self::Custom {
            host: host.into(),
            tls: true,
        }
    }

    /// Custom plain-text endpoint
    pub fn insecure(host: impl Into<String>) -> Self {
        Self::Custom {
            host: host.into(),
            tls: false,
        }
    }

    /// Host name (and port) of the hub
    pub fn host(&self) -> &str {
        match self {
            Self::Production => "socket-v3.bittrex.com",
            Self::Custom { host, .. } => host,
        }
    }

    fn tls(&self) -> bool {
        match self {
            Self::Production => true,
            Self::Custom { tls, .. } => *tls,
        }
    }

    /// Base URL for the HTTP legs of the handshake
    pub fn http_base(&self) -> String {
        let scheme = if self.tls() { "https" } else { "http" };
        format!("{}://{}/signalr", scheme, self.host())
    }

    /// Base URL for the websocket leg
    pub fn ws_base(&self) -> String {
        let scheme = if self.tls() { "wss" } else { "ws" };
        format!("{}://{}/signalr", scheme, self.host())
    }

    /// `GET` URL that returns the connection token
    pub fn negotiate_url(&self, hubs: &[String]) -> String {
        let query = encode_query(&[
            ("clientProtocol", CLIENT_PROTOCOL.to_string()),
            ("connectionData", connection_data(hubs)),
        ]);
        format!("{}/negotiate?{}", self.http_base(), query)
    }

    /// Websocket URL for a negotiated connection
    pub fn connect_url(&self, token: &str, hubs: &[String]) -> String {
        let query = encode_query(&[
            ("transport", "webSockets".to_string()),
            ("clientProtocol", CLIENT_PROTOCOL.to_string()),
            ("connectionToken", token.to_string()),
            ("connectionData", connection_data(hubs)),
            ("tid", "10".to_string()),
        ]);
        format!("{}/connect?{}", self.ws_base(), query)
    }

    /// `GET` URL that moves the connection into the started state
    pub fn start_url(&self, token: &str, hubs: &[String]) -> String {
        let query = encode_query(&[
            ("transport", "webSockets".to_string()),
            ("clientProtocol", CLIENT_PROTOCOL.to_string()),
            ("connectionToken", token.to_string()),
            ("connectionData", connection_data(hubs)),
        ]);
        format!("{}/start?{}", self.http_base(), query)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ws_base())
    }
}

/// `[{"name":"<hub>"}, ...]`
fn connection_data(hubs: &[String]) -> String {
    let hubs: Vec<_> = hubs
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();
    serde_json::Value::Array(hubs).to_string()
}

fn encode_query(pairs: &[(&str, String)]) -> String {
    // Encoding a flat list of string pairs cannot fail
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}
