//! SignalR classic hub frames

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Client-to-hub method invocation, `{"H","M","A","I"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubInvocation {
    /// Hub name
    #[serde(rename = "H")]
    pub hub: String,
    /// Method name
    #[serde(rename = "M")]
    pub method: String,
    /// Positional arguments
    #[serde(rename = "A", default)]
    pub args: Vec<Value>,
    /// Invocation id echoed in the result frame
    #[serde(rename = "I", deserialize_with = "deserialize_id")]
    pub id: u64,
}

/// Hub-to-client method call carried inside a push frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Hub that sent the call
    #[serde(rename = "H")]
    pub hub: String,
    /// Declared method name
    #[serde(rename = "M")]
    pub method: String,
    /// Payload blocks, in order
    #[serde(rename = "A", default)]
    pub payloads: Vec<Value>,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct HubResponse {
    /// Invocation id
    pub id: u64,
    /// `R`, or `Null` when absent
    pub result: Value,
    /// `E`, the hub's error message
    pub error: Option<String>,
}

/// Any frame the hub sends
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Answer to an invocation
    Response(HubResponse),
    /// Zero or more hub-to-client calls
    Push(Vec<InboundFrame>),
    /// `{}`
    KeepAlive,
    /// Anything else (progress, group tokens)
    Other,
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(rename = "I", deserialize_with = "deserialize_id")]
    id: u64,
    #[serde(rename = "R", default)]
    result: Value,
    #[serde(rename = "E", default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct RawPush {
    #[serde(rename = "M", default)]
    messages: Vec<InboundFrame>,
}

/// Classify one text frame
pub fn parse_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        return Ok(ServerFrame::Other);
    };

    if object.is_empty() {
        return Ok(ServerFrame::KeepAlive);
    }
    if object.contains_key("I") {
        let raw: RawResponse = serde_json::from_value(value)?;
        return Ok(ServerFrame::Response(HubResponse {
            id: raw.id,
            result: raw.result,
            error: raw.error,
        }));
    }
    if object.get("M").map_or(false, Value::is_array) {
        let raw: RawPush = serde_json::from_value(value)?;
        return Ok(ServerFrame::Push(raw.messages));
    }
    Ok(ServerFrame::Other)
}

/// Returns true for the `{"S":1}` frame the hub sends once the socket is live
pub fn is_init_frame(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("S").and_then(Value::as_u64))
        == Some(1)
}

/// Invocation ids go out as numbers but some hubs echo them as strings
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(D::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}
