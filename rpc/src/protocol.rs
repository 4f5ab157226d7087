//! JSON-RPC 2.0 wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// Protocol version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Data-source or internal failure.
pub const INTERNAL_ERROR: i64 = -32603;
/// Session call-ordering error. Also used for a disallowed HTTP method.
pub const SESSION_ERROR: i64 = -32000;
/// Request sent to a path other than `/`.
pub const PATH_NOT_ALLOWED: i64 = -32001;

/// An incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

/// Diagnostic payload attached to every fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultData {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FaultData>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(FaultData {
                kind: kind.into(),
                detail: None,
            }),
        }
    }
}

impl From<&RpcError> for ErrorObject {
    fn from(err: &RpcError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: Some(FaultData {
                kind: err.kind().to_string(),
                detail: err.detail(),
            }),
        }
    }
}

/// An outgoing response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
    pub id: Value,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Encode to bytes. Falls back to a fixed internal-error body.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| {
            br#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"failed to encode response"},"id":null}"#
                .to_vec()
        })
    }
}
