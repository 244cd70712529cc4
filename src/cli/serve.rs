//! Serve command - Start the JSON-RPC server

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::methods::default_methods;
use crate::rpc::RpcServer;

/// Start the JSON-RPC server
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides control.listen-address)
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Port to listen on (overrides control.listen-port)
    #[arg(short, long = "listen-port")]
    pub listen_port: Option<u16>,

    /// Worker threads sharing the socket (overrides control.workers)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Answer CORS preflight requests (overrides control.allow-cors)
    #[arg(long)]
    pub allow_cors: bool,
}

impl ServeArgs {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(address) = &self.listen_address {
            config.control.listen_address = address.clone();
        }
        if let Some(port) = self.listen_port {
            config.control.listen_port = port;
        }
        if let Some(workers) = self.workers {
            config.control.workers = workers;
        }
        if self.allow_cors {
            config.control.allow_cors = true;
        }
        config.validate()
    }
}

pub async fn run(args: ServeArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config)?;
    log_features(&config);

    if !config.control.enabled {
        info!("Control interface disabled, nothing to serve");
        return Ok(());
    }

    let mut server = RpcServer::new(config.server_config(), Arc::new(default_methods()));
    server.start().context("Failed to start RPC server")?;

    shutdown_signal().await?;

    server.stop();
    tokio::task::spawn_blocking(move || server.join())
        .await
        .context("Failed to join RPC server")?;

    Ok(())
}

fn log_features(config: &Config) {
    let flag = |value: bool| if value { "YES" } else { "NO" };

    info!(" CONTROL ----------------------");
    info!("         ENABLED : {}", flag(config.control.enabled));
    info!("          LISTEN : {}:{}", config.control.listen_address, config.control.listen_port);
    info!("         WORKERS : {}", config.control.workers);
    info!("      ALLOW CORS : {}", flag(config.control.allow_cors));
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    info!("Shutdown signal received");
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");
    Ok(())
}
