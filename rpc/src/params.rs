//! Parameter decoding.
//!
//! Params may be positional (a JSON array) or named (a JSON object). A
//! missing parameter and an explicit `null` are treated the same.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RpcError, RpcResult};

/// Decode an optional parameter by position or name.
pub(crate) fn optional<T: DeserializeOwned>(
    params: Option<&Value>,
    index: usize,
    name: &str,
) -> RpcResult<Option<T>> {
    let raw = match params {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => items.get(index),
        Some(Value::Object(fields)) => fields.get(name),
        Some(_) => {
            return Err(RpcError::invalid_params(
                "params must be an array or an object",
            ))
        }
    };

    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| RpcError::invalid_params(format!("{}: {}", name, err))),
    }
}

/// Decode a required parameter by position or name.
pub(crate) fn required<T: DeserializeOwned>(
    params: Option<&Value>,
    index: usize,
    name: &str,
) -> RpcResult<T> {
    optional(params, index, name)?
        .ok_or_else(|| RpcError::invalid_params(format!("missing parameter: {}", name)))
}
