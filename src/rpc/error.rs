//! Server lifecycle errors

use std::io;

use thiserror::Error;

/// Failures of the listening socket and worker pool.
///
/// Per-request problems never surface here; they become JSON-RPC error
/// envelopes inside the handler.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to configure listener: {0}")]
    Listener(#[source] io::Error),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("server was already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, ServerError>;
