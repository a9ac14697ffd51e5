//! Wire envelopes exchanged with the editing host.
//!
//! Frames are single-line JSON objects terminated by `\n`. Requests carry
//! `{id, method, params}`; responses carry `{id, result}` or
//! `{id, error: {message}}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The only method the engine ever invokes on the host.
pub const EXECUTE_SCRIPT: &str = "execute_script";

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    /// Build an `execute_script` request carrying an opaque script fragment.
    pub fn execute_script(id: u64, script: &str) -> Self {
        Self {
            id,
            method: EXECUTE_SCRIPT.to_string(),
            params: json!({ "script": script }),
        }
    }

    /// Encode as a single wire line (without the trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcErrorBody {
    pub message: String,
}

/// Inbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(RpcErrorBody {
                message: message.into(),
            }),
        }
    }

    /// Split into the value the caller sees: an error wins over a result,
    /// a missing result reads as `null`.
    pub fn into_outcome(self) -> Result<Value, String> {
        match self.error {
            Some(err) => Err(err.message),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Decode one inbound line. Blank lines decode as an error like any other
/// malformed frame.
pub fn decode_response(line: &str) -> serde_json::Result<RpcResponse> {
    serde_json::from_str(line.trim())
}
