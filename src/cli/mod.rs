//! CLI module - Command definitions and handlers

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

pub mod config;
pub mod serve;

/// minirpc - minimal JSON-RPC 2.0 server
///
/// Serves application methods at POST /rpc over HTTP.
#[derive(Parser, Debug)]
#[command(name = "minirpc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase debug level (repeat for more)
    #[arg(short = 'D', long = "debug", global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file path
    #[arg(short, long, global = true, env = "MINIRPC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the JSON-RPC server
    Serve(serve::ServeArgs),

    /// Show or initialize configuration
    Config(config::ConfigArgs),
}
