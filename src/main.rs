//! minirpc CLI - Entry point
//!
//! Usage: minirpc [-D...] [-c FILE] <command> [options]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use minirpc::cli::{Cli, Commands};
use minirpc::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    let config = Config::load_with(cli.config.as_deref())?;

    // Initialize tracing; RUST_LOG wins over -D and the config debug level
    let level = cli.debug.max(config.debug.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve(args) => minirpc::cli::serve::run(args, config).await,
        Commands::Config(args) => minirpc::cli::config::run(args, &config),
    }
}

fn default_directive(level: u8) -> &'static str {
    match level {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
