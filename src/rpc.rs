//! JSON-RPC envelope types
//!
//! The gateway never interprets more of a message than it needs: `id` and
//! `params`/`result` stay as raw JSON values so rewritten envelopes preserve
//! whatever the upstream handler produced.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request or response envelope.
///
/// A response carries either `result` or `error`, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonrpcMessage {
    /// Protocol version tag ("2.0")
    #[serde(rename = "jsonrpc", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Correlation identifier shared by a request/response pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Method name (requests only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Call parameters (requests only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Success payload (responses only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error payload (responses only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonrpcMessage {
    /// Parse an envelope from raw body bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    /// Build a success envelope carrying the given correlation id/version
    pub fn success(id: Option<Value>, version: Option<String>, result: Value) -> Self {
        Self {
            version,
            id,
            result: Some(result),
            ..Default::default()
        }
    }

    /// Build an error envelope carrying the given correlation id/version
    pub fn error(id: Option<Value>, version: Option<String>, code: i64, message: &str) -> Self {
        Self {
            version,
            id,
            error: Some(JsonError {
                code,
                message: message.to_string(),
                data: None,
            }),
            ..Default::default()
        }
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // envelope fields are plain JSON-serializable types
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Positional string parameter at `index`, if present
    pub fn param_str(&self, index: usize) -> Option<&str> {
        self.params.as_ref()?.as_array()?.get(index)?.as_str()
    }

    /// Positional boolean parameter at `index`, defaulting to false
    pub fn param_bool(&self, index: usize) -> bool {
        self.params
            .as_ref()
            .and_then(|p| p.as_array())
            .and_then(|a| a.get(index))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_envelope() {
        let raw = br#"{"jsonrpc":"2.0","id":7,"method":"eth_getBalance","params":["0xabc","latest"]}"#;
        let msg = JsonrpcMessage::from_bytes(raw).expect("parse");
        assert_eq!(msg.version.as_deref(), Some("2.0"));
        assert_eq!(msg.id, Some(json!(7)));
        assert_eq!(msg.method.as_deref(), Some("eth_getBalance"));
        assert_eq!(msg.param_str(0), Some("0xabc"));
        assert_eq!(msg.param_str(1), Some("latest"));
        assert_eq!(msg.param_str(2), None);
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(JsonrpcMessage::from_bytes(b"not json at all").is_none());
        assert!(JsonrpcMessage::from_bytes(b"").is_none());
    }

    #[test]
    fn test_success_envelope_shape() {
        let msg = JsonrpcMessage::success(Some(json!(1)), Some("2.0".into()), json!({"ok": true}));
        let bytes = msg.to_bytes();
        let round: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(round["jsonrpc"], "2.0");
        assert_eq!(round["id"], 1);
        assert_eq!(round["result"]["ok"], true);
        assert!(round.get("error").is_none());
        assert!(round.get("method").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let msg = JsonrpcMessage::error(Some(json!("abc")), Some("2.0".into()), -32802, "unauthorized to get balance");
        let round: Value = serde_json::from_slice(&msg.to_bytes()).unwrap();
        assert_eq!(round["id"], "abc");
        assert_eq!(round["error"]["code"], -32802);
        assert_eq!(round["error"]["message"], "unauthorized to get balance");
        assert!(round.get("result").is_none());
        assert!(round["error"].get("data").is_none());
    }

    #[test]
    fn test_param_bool_defaults_false() {
        let raw = br#"{"jsonrpc":"2.0","id":1,"method":"eth_getBlockByNumber","params":["0x10"]}"#;
        let msg = JsonrpcMessage::from_bytes(raw).unwrap();
        assert!(!msg.param_bool(1));

        let raw = br#"{"jsonrpc":"2.0","id":1,"method":"eth_getBlockByNumber","params":["0x10",true]}"#;
        let msg = JsonrpcMessage::from_bytes(raw).unwrap();
        assert!(msg.param_bool(1));
    }

    #[test]
    fn test_result_and_error_are_mutually_exclusive_in_builders() {
        let ok = JsonrpcMessage::success(None, None, json!(1));
        assert!(ok.error.is_none());
        let err = JsonrpcMessage::error(None, None, -32800, "boom");
        assert!(err.result.is_none());
    }
}
