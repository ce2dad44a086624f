//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the message types exchanged over the line stream.
//!
//! # Message Types
//!
//! - **Request**: a message with an `id` key, answered with exactly one response
//! - **Notification**: a message without `id`, never answered
//! - **Response**: `id` plus exactly one of `result` / `error`
//!
//! # Decoding Policy
//!
//! - Lines that are not JSON are dropped (the client may emit partial writes)
//! - JSON that is not a usable request object is answered with an error and `id: null`
//! - `jsonrpc` is echoed as `"2.0"` but not required on input

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "academiadepolitie";

/// Error code used for every JSON-RPC level fault.
pub const INTERNAL_ERROR: i32 = -32603;

/// A JSON-RPC 2.0 request ID.
///
/// Echoed verbatim in the response, including `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID (integer or float).
    Number(serde_json::Number),
    /// String request ID.
    String(String),
    /// Explicit `null` ID.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone)]
pub struct JsonRpcRequest {
    /// Request identifier, echoed in the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Parameters for the method (`{}` when absent).
    pub params: Value,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone)]
pub struct JsonRpcNotification {
    /// The notification method.
    pub method: String,

    /// Parameters for the notification (`{}` when absent).
    pub params: Value,
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

/// Why a line could not be turned into an [`IncomingMessage`].
#[derive(Debug)]
pub enum ParseFailure {
    /// Not JSON at all. Dropped without a response.
    Malformed(serde_json::Error),
    /// JSON, but not a usable request. Answered with an error.
    Invalid {
        /// The ID to answer with, `null` when it cannot be recovered.
        id: RequestId,
        /// What was wrong.
        reason: String,
    },
}

/// Parses one line into an incoming message.
///
/// # Errors
///
/// Returns [`ParseFailure::Malformed`] for non-JSON input and
/// [`ParseFailure::Invalid`] for JSON that is not a request object.
pub fn parse_message(json: &str) -> Result<IncomingMessage, ParseFailure> {
    let value: Value = serde_json::from_str(json).map_err(ParseFailure::Malformed)?;

    let Value::Object(mut obj) = value else {
        return Err(ParseFailure::Invalid {
            id: RequestId::Null,
            reason: "expected a JSON object".to_string(),
        });
    };

    let id = match obj.remove("id") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<RequestId>(raw).map_err(|_| ParseFailure::Invalid {
                id: RequestId::Null,
                reason: "id must be a string, a number or null".to_string(),
            })?,
        ),
    };

    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err(ParseFailure::Invalid {
                id: id.unwrap_or(RequestId::Null),
                reason: "method must be a string".to_string(),
            })
        }
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(params) => params,
    };

    Ok(match id {
        Some(id) => IncomingMessage::Request(JsonRpcRequest { id, method, params }),
        None => IncomingMessage::Notification(JsonRpcNotification { method, params }),
    })
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A human-readable description of the error.
    pub message: String,
}

impl JsonRpcErrorData {
    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
        }
    }
}

/// The body of a response: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Successful result.
    Result(Value),
    /// Failure details.
    Error(JsonRpcErrorData),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// Result or error.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// Creates a new error response.
    #[must_use]
    pub fn error(id: RequestId, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            outcome: Outcome::Error(JsonRpcErrorData::internal(message)),
        }
    }
}
