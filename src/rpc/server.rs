//! RPC server lifecycle and worker pool
//!
//! `start()` binds the listening socket and hands it to a supervisor thread,
//! which spawns `worker_count - 1` extra workers and then serves on its own
//! thread. Every worker owns a current-thread tokio runtime and a clone of
//! the shared socket, and handles one connection at a time to completion.
//! A shared [`CancellationToken`] ends all accept loops.

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::MethodDispatcher;
use super::error::{Result, ServerError};
use super::handler::RequestHandler;

/// Delay before retrying after a failed accept (e.g. fd exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Listening and concurrency settings, fixed once the server starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub worker_count: usize,
    pub allow_cors: bool,
    /// Deadline for a client to deliver the request head, and again its body.
    /// A worker serves one connection at a time, so a stalled peer holds it
    /// until this expires.
    pub read_timeout: Duration,
    /// Largest request body accepted; bigger bodies get 413
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 10081,
            worker_count: 1,
            allow_cors: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Lifecycle state of an [`RpcServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Running,
    Stopping,
    Joined,
}

/// Cloneable handle that asks a running server to stop
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// JSON-RPC over HTTP server
///
/// Preconditions: call `stop()` only after `start()`, and `join()` only
/// after `stop()`; joining a server that was never stopped blocks until
/// something else stops it.
pub struct RpcServer {
    config: ServerConfig,
    handler: RequestHandler,
    shutdown: CancellationToken,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    supervisor: Option<JoinHandle<()>>,
}

impl RpcServer {
    pub fn new(config: ServerConfig, dispatcher: Arc<dyn MethodDispatcher>) -> Self {
        let handler = RequestHandler::new(dispatcher, config.allow_cors);
        Self {
            config,
            handler,
            shutdown: CancellationToken::new(),
            state: ServerState::Created,
            local_addr: None,
            supervisor: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Address the socket is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Bind the socket and serve on a background supervisor thread.
    ///
    /// Returns as soon as the socket is listening.
    pub fn start(&mut self) -> Result<()> {
        let pool = self.prepare()?;

        let supervisor = thread::Builder::new()
            .name("rpc".to_string())
            .spawn(move || pool.run())
            .map_err(ServerError::Spawn)?;

        self.supervisor = Some(supervisor);
        self.state = ServerState::Running;
        Ok(())
    }

    /// Bind the socket and serve on the calling thread until stopped through
    /// a [`StopHandle`].
    pub fn run(&mut self) -> Result<()> {
        let pool = self.prepare()?;
        self.state = ServerState::Running;
        pool.run();
        self.state = ServerState::Joined;
        Ok(())
    }

    /// Signal every worker to leave its accept loop.
    ///
    /// Idle workers return promptly; a connection being served finishes first.
    pub fn stop(&mut self) {
        info!("Stopping RPC server");
        self.shutdown.cancel();
        if self.state == ServerState::Running {
            self.state = ServerState::Stopping;
        }
    }

    /// Wait for all worker threads to exit
    pub fn join(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            if supervisor.join().is_err() {
                error!("RPC supervisor thread panicked");
            }
        }
        self.state = ServerState::Joined;
        info!("RPC server stopped");
    }

    fn prepare(&mut self) -> Result<WorkerPool> {
        if self.state != ServerState::Created {
            return Err(ServerError::AlreadyStarted);
        }
        if self.config.worker_count == 0 {
            return Err(ServerError::NoWorkers);
        }

        let address = self.config.bind_address();
        let listener = StdTcpListener::bind((self.config.address.as_str(), self.config.port))
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        listener
            .set_nonblocking(true)
            .map_err(ServerError::Listener)?;
        let local_addr = listener.local_addr().map_err(ServerError::Listener)?;
        self.local_addr = Some(local_addr);

        info!(
            "RPC server listening on {} ({} worker(s), cors: {})",
            local_addr, self.config.worker_count, self.config.allow_cors
        );

        Ok(WorkerPool {
            listener,
            conn: ConnSettings {
                handler: self.handler.clone(),
                read_timeout: self.config.read_timeout,
                max_body_bytes: self.config.max_body_bytes,
            },
            shutdown: self.shutdown.clone(),
            size: self.config.worker_count,
        })
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        if self.supervisor.is_some() {
            self.shutdown.cancel();
            self.join();
        }
    }
}

/// Per-connection settings shared by every worker
#[derive(Clone)]
struct ConnSettings {
    handler: RequestHandler,
    read_timeout: Duration,
    max_body_bytes: usize,
}

/// Fixed-size set of workers over one shared listener
struct WorkerPool {
    listener: StdTcpListener,
    conn: ConnSettings,
    shutdown: CancellationToken,
    size: usize,
}

impl WorkerPool {
    /// Spawn the extra workers, serve on this thread, then wait for the rest
    fn run(self) {
        let mut workers = Vec::with_capacity(self.size.saturating_sub(1));

        for id in 1..self.size {
            let listener = match self.listener.try_clone() {
                Ok(listener) => listener,
                Err(err) => {
                    error!("Failed to share listener with worker {}: {}", id, err);
                    continue;
                }
            };
            let settings = self.conn.clone();
            let shutdown = self.shutdown.clone();

            match thread::Builder::new()
                .name(format!("rpc-worker-{}", id))
                .spawn(move || run_worker(id, listener, settings, shutdown))
            {
                Ok(worker) => workers.push(worker),
                Err(err) => error!("Failed to spawn worker {}: {}", id, err),
            }
        }

        run_worker(0, self.listener, self.conn, self.shutdown);

        for worker in workers {
            if worker.join().is_err() {
                error!("RPC worker thread panicked");
            }
        }
    }
}

fn run_worker(
    id: usize,
    listener: StdTcpListener,
    settings: ConnSettings,
    shutdown: CancellationToken,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Worker {} failed to build runtime: {}", id, err);
            return;
        }
    };

    runtime.block_on(accept_loop(id, listener, settings, shutdown));
}

async fn accept_loop(
    id: usize,
    listener: StdTcpListener,
    settings: ConnSettings,
    shutdown: CancellationToken,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!("Worker {} failed to register listener: {}", id, err);
            return;
        }
    };

    debug!("Worker {} accepting connections", id);

    loop {
        let (stream, peer_addr) = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Worker {} accept failed: {}", id, err);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        debug!("Worker {} serving {}", id, peer_addr);
        serve_connection(stream, &settings, &shutdown).await;
    }

    debug!("Worker {} exiting", id);
}

async fn serve_connection(
    stream: TcpStream,
    settings: &ConnSettings,
    shutdown: &CancellationToken,
) {
    let io = TokioIo::new(stream);
    let service_settings = settings.clone();
    let service = service_fn(move |req| respond(req, service_settings.clone()));

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(settings.read_timeout)
        .keep_alive(false)
        .serve_connection(io, service);
    tokio::pin!(conn);

    let mut draining = false;
    let result = loop {
        tokio::select! {
            res = conn.as_mut() => break res,
            _ = shutdown.cancelled(), if !draining => {
                conn.as_mut().graceful_shutdown();
                draining = true;
            }
        }
    };

    if let Err(err) = result {
        if err.is_incomplete_message() {
            debug!("Client disconnected: {}", err);
        } else {
            warn!("Error serving connection: {}", err);
        }
    }
}

fn plain_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

async fn respond(
    req: Request<Incoming>,
    settings: ConnSettings,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    debug!("Handling {} {}", parts.method, parts.uri.path());

    let limited = Limited::new(body, settings.max_body_bytes);
    let body = match tokio::time::timeout(settings.read_timeout, limited.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(err)) if err.is::<LengthLimitError>() => {
            warn!(
                "Request body exceeds {} bytes, rejecting",
                settings.max_body_bytes
            );
            return Ok(plain_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload too large",
            ));
        }
        Ok(Err(err)) => {
            warn!("Failed to read request body: {}", err);
            return Ok(plain_response(StatusCode::BAD_REQUEST, "bad request"));
        }
        Err(_) => {
            warn!("Timed out reading request body");
            return Ok(plain_response(StatusCode::REQUEST_TIMEOUT, "request timeout"));
        }
    };

    let reply = settings
        .handler
        .handle(&parts.method, parts.uri.path(), &parts.headers, &body);

    let mut response = Response::new(Full::new(reply.body));
    *response.status_mut() = reply.status;
    *response.headers_mut() = reply.headers;
    Ok(response)
}
