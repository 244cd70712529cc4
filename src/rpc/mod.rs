//! JSON-RPC 2.0 dispatch engine
//!
//! - `jsonrpc` - envelope types and error-code to HTTP status mapping
//! - `validate` - request envelope validation
//! - `dispatcher` - the method dispatch capability and built-in fallbacks
//! - `handler` - routing, single/batch processing, CORS preflight
//! - `server` - listener, worker pool and start/stop/join lifecycle

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod server;
pub mod validate;

pub use dispatcher::{
    serve_build_info, serve_method_not_found, serve_unimplemented, DispatchResult,
    MethodDispatcher, MethodTable,
};
pub use error::ServerError;
pub use handler::{HttpReply, RequestHandler, RPC_PATH, TEST_PATH};
pub use jsonrpc::{build_error, http_status, RpcError, RpcRequest, RpcResponse};
pub use server::{RpcServer, ServerConfig, ServerState, StopHandle};
pub use validate::validate;
