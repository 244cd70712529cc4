//! JSON-RPC 2.0 envelope types and the error-code to HTTP status mapping

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version stamped on every response
pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

// Reserved for application-defined server errors
pub const SERVER_ERROR_START: i64 = -32099;
pub const SERVER_ERROR_END: i64 = -32000;

/// JSON-RPC 2.0 Request
///
/// Only built from values that already passed [`crate::rpc::validate`], so
/// `method` and `jsonrpc` are always present. A missing `id` reads as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Value,
}

impl RpcRequest {
    /// Create a request with a fresh envelope
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Params as a JSON value, `null` when absent
    pub fn params_or_null(&self) -> Value {
        self.params.clone().unwrap_or(Value::Null)
    }
}

/// JSON-RPC 2.0 Response
///
/// Exactly one of `result` and `error` is set; use the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Replace the id and re-stamp the protocol version
    pub fn with_id(mut self, id: Value) -> Self {
        self.id = id;
        self.jsonrpc = JSONRPC_VERSION.to_string();
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// HTTP status this single response maps to
    pub fn http_status(&self) -> StatusCode {
        match &self.error {
            Some(error) => http_status(error.code),
            None => StatusCode::OK,
        }
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail to the error
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse Error")
    }

    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    /// Clients of the original protocol match on this exact message.
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Invalid Request")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    /// Application-defined error; `None` unless `code` lies in -32099..=-32000.
    pub fn server_error(code: i64, message: impl Into<String>) -> Option<Self> {
        is_server_error(code).then(|| Self::new(code, message))
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

pub fn is_server_error(code: i64) -> bool {
    (SERVER_ERROR_START..=SERVER_ERROR_END).contains(&code)
}

/// Map an error code reported by a dispatcher to the HTTP status for it.
///
/// Only method-not-found gets its own status; every other code, including
/// an `INVALID_REQUEST` a dispatcher chooses to return, is a 500. Invalid
/// params and internal errors are therefore not distinguishable over HTTP.
/// Envelopes rejected by validation never reach a dispatcher and are
/// reported as 400 by the handler.
pub fn http_status(code: i64) -> StatusCode {
    match code {
        METHOD_NOT_FOUND => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build an error envelope with a `null` id; the handler fills in the
/// request id once it is known.
pub fn build_error(code: i64, message: impl Into<String>) -> RpcResponse {
    RpcResponse::failure(Value::Null, RpcError::new(code, message))
}
