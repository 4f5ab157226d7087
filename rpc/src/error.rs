//! RPC error types.

use std::error::Error as StdError;

use sqlbook_session::SessionError;
use thiserror::Error;

use crate::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, SESSION_ERROR,
};

/// RPC errors.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The payload is not JSON.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The payload is JSON but not a request object.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Unknown method name.
    #[error("method not found: {method}")]
    MethodNotFound { method: String },

    /// Missing or mistyped parameter.
    #[error("invalid params: {message}")]
    InvalidParams { message: String },

    /// A result could not be encoded.
    #[error("internal error: {message}")]
    Internal { message: String },

    /// Error from the session.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RpcError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// JSON-RPC error code.
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse { .. } => PARSE_ERROR,
            RpcError::InvalidRequest { .. } => INVALID_REQUEST,
            RpcError::MethodNotFound { .. } => METHOD_NOT_FOUND,
            RpcError::InvalidParams { .. } => INVALID_PARAMS,
            RpcError::Internal { .. } => INTERNAL_ERROR,
            RpcError::Session(err) if err.is_sequencing() => SESSION_ERROR,
            RpcError::Session(_) => INTERNAL_ERROR,
        }
    }

    /// Error variant name reported in the fault data.
    pub fn kind(&self) -> &'static str {
        match self {
            RpcError::Parse { .. } => "ParseError",
            RpcError::InvalidRequest { .. } => "InvalidRequest",
            RpcError::MethodNotFound { .. } => "MethodNotFound",
            RpcError::InvalidParams { .. } => "InvalidParams",
            RpcError::Internal { .. } => "InternalError",
            RpcError::Session(err) => err.kind(),
        }
    }

    /// Root cause of the error, when it says more than the message does.
    pub fn detail(&self) -> Option<String> {
        let mut cause: &(dyn StdError + 'static) = self;
        while let Some(next) = cause.source() {
            cause = next;
        }
        let detail = cause.to_string();
        (detail != self.to_string()).then_some(detail)
    }
}

/// Result type for RPC calls.
pub type RpcResult<T> = Result<T, RpcError>;
