//! minirpc - minimal JSON-RPC 2.0 dispatch server over HTTP
//!
//! Exposes a small set of application methods at `POST /rpc` without a
//! bespoke wire protocol.
//!
//! ## Key Concepts
//!
//! - **Dispatcher**: the application implements [`rpc::MethodDispatcher`]
//!   (or registers closures in a [`rpc::MethodTable`]) and the server does the rest
//! - **Batches**: a JSON array of requests is answered in order, and the HTTP
//!   status is the worst status of any element
//! - **Workers**: `worker_count` OS threads share one listening socket and each
//!   serves a connection to completion
//! - **Endpoints**: `POST /rpc`, `OPTIONS /rpc` (CORS preflight), `GET /test`

pub mod cli;
pub mod config;
pub mod methods;
pub mod rpc;

pub use config::Config;
pub use methods::default_methods;
pub use rpc::{
    MethodDispatcher, MethodTable, RpcError, RpcRequest, RpcResponse, RpcServer, ServerConfig,
};
