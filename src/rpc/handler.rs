//! HTTP request handling for the RPC endpoint
//!
//! Routing, JSON-RPC single/batch processing and CORS preflight. This module
//! is transport-free: it takes the pieces of an HTTP request and returns an
//! [`HttpReply`], so the worker loop only has to move bytes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ALLOW, CONTENT_TYPE,
};
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::dispatcher::MethodDispatcher;
use super::jsonrpc::{RpcError, RpcRequest, RpcResponse};
use super::validate::validate;

pub const RPC_PATH: &str = "/rpc";
pub const TEST_PATH: &str = "/test";

const ALLOWED_METHODS: &str = "GET,POST,OPTIONS";
const TEST_REPLY: &str = "Testing 1,2,3";

/// Status, headers and body produced for one HTTP request
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpReply {
    fn plain(status: StatusCode, body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status,
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    /// Body parsed as JSON, for inspection in tests and tooling
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Answers requests for the RPC endpoint with a shared dispatcher
#[derive(Clone)]
pub struct RequestHandler {
    dispatcher: Arc<dyn MethodDispatcher>,
    allow_cors: bool,
}

impl RequestHandler {
    pub fn new(dispatcher: Arc<dyn MethodDispatcher>, allow_cors: bool) -> Self {
        Self {
            dispatcher,
            allow_cors,
        }
    }

    pub fn allow_cors(&self) -> bool {
        self.allow_cors
    }

    /// Route one HTTP request by path and method
    pub fn handle(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> HttpReply {
        if path == TEST_PATH && *method == Method::GET {
            return HttpReply::plain(StatusCode::OK, TEST_REPLY);
        }

        if path != RPC_PATH {
            return HttpReply::plain(StatusCode::NOT_FOUND, "not found");
        }

        if *method == Method::OPTIONS {
            self.preflight(headers)
        } else if *method == Method::POST {
            let (status, body) = self.process(body);
            self.json_reply(status, &body)
        } else {
            HttpReply::plain(StatusCode::BAD_REQUEST, "bad request")
        }
    }

    /// Parse, validate and dispatch a request body.
    ///
    /// Returns the HTTP status and the response envelope (an array for batches).
    pub fn process(&self, body: &[u8]) -> (StatusCode, Value) {
        let parsed: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(err) => {
                debug!("Rejecting unparsable body: {}", err);
                let res = RpcResponse::failure(Value::Null, RpcError::parse_error());
                return (StatusCode::INTERNAL_SERVER_ERROR, to_value(&res));
            }
        };

        match parsed {
            Value::Array(items) => {
                let mut status = StatusCode::OK;
                let mut responses = Vec::with_capacity(items.len());
                for item in &items {
                    let (item_status, res) = self.serve_one(item);
                    if item_status.as_u16() > status.as_u16() {
                        status = item_status;
                    }
                    responses.push(to_value(&res));
                }
                (status, Value::Array(responses))
            }
            other => {
                let (status, res) = self.serve_one(&other);
                (status, to_value(&res))
            }
        }
    }

    /// Validate and dispatch a single request value
    fn serve_one(&self, value: &Value) -> (StatusCode, RpcResponse) {
        if !validate(value) {
            debug!("Invalid request envelope");
            return invalid_request(value);
        }

        let req: RpcRequest = match serde_json::from_value(value.clone()) {
            Ok(req) => req,
            Err(err) => {
                warn!("Validated request failed to decode: {}", err);
                return invalid_request(value);
            }
        };

        let res = self.dispatch(req);
        (res.http_status(), res)
    }

    /// Run the dispatcher, converting a panic into an internal error
    fn dispatch(&self, req: RpcRequest) -> RpcResponse {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatcher.serve(&req)));

        let res = match outcome {
            Ok(Ok(result)) => RpcResponse::success(Value::Null, result),
            Ok(Err(err)) => {
                debug!("Method '{}' failed: {}", req.method, err);
                RpcResponse::failure(Value::Null, err)
            }
            Err(_) => {
                error!("Method '{}' panicked", req.method);
                RpcResponse::failure(Value::Null, RpcError::internal_error("Internal error"))
            }
        };

        res.with_id(req.id)
    }

    fn preflight(&self, request_headers: &HeaderMap) -> HttpReply {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));

        if self.allow_cors {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            for value in request_headers.get_all(ACCESS_CONTROL_REQUEST_HEADERS) {
                headers.append(ACCESS_CONTROL_ALLOW_HEADERS, value.clone());
            }
        }

        HttpReply {
            status: StatusCode::OK,
            headers,
            body: Bytes::new(),
        }
    }

    fn json_reply(&self, status: StatusCode, body: &impl Serialize) -> HttpReply {
        let body = match serde_json::to_vec(body) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                error!("Failed to serialize response: {}", err);
                return HttpReply::plain(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if self.allow_cors {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }

        HttpReply {
            status,
            headers,
            body,
        }
    }
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("allow_cors", &self.allow_cors)
            .finish_non_exhaustive()
    }
}

fn invalid_request(value: &Value) -> (StatusCode, RpcResponse) {
    (
        StatusCode::BAD_REQUEST,
        RpcResponse::failure(echo_id(value), RpcError::invalid_request()),
    )
}

/// Id to report for a request that failed validation: the object's own
/// scalar `id` when it has one, `null` otherwise.
fn echo_id(value: &Value) -> Value {
    match value.get("id") {
        Some(id @ (Value::Null | Value::String(_) | Value::Number(_))) => id.clone(),
        _ => Value::Null,
    }
}

fn to_value(res: &RpcResponse) -> Value {
    serde_json::to_value(res).unwrap_or_else(|err| {
        error!("Failed to encode response envelope: {}", err);
        Value::Null
    })
}
