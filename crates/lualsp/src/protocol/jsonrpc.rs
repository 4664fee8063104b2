//! JSON-RPC 2.0 message types for the server side of an LSP session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// A request arrived before `initialize` (LSP extension code).
pub const SERVER_NOT_INITIALIZED: i64 = -32002;

const VERSION: &str = "2.0";

/// Any message received from the client.
///
/// Requests carry both `id` and `method`, notifications only `method`, and
/// responses to server-initiated requests only `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Protocol version, expected to be "2.0".
    pub jsonrpc: String,
    /// Request identifier; absent on notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to invoke.
    #[serde(default)]
    pub method: Option<String>,
    /// Optional parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl IncomingMessage {
    /// Whether the message declares protocol version 2.0.
    #[must_use]
    pub fn has_valid_version(&self) -> bool {
        self.jsonrpc == VERSION
    }

    /// Method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Whether the message expects a response.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    /// Whether the message is a notification.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }
}

/// A JSON-RPC 2.0 response message.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Identifier of the request being answered, or null.
    pub id: Value,
    /// The result on success; serialised even when null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a success response.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
