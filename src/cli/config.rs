//! `minirpc config` command
//!
//! # Usage
//! ```bash
//! minirpc config                  # Show effective config
//! minirpc config --path           # Show config file locations
//! minirpc config --init           # Write .minirpc/config.toml
//! minirpc config --init --global  # Write ~/.minirpc/config.toml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show config file paths
    #[arg(long)]
    pub path: bool,

    /// Write a default config file
    #[arg(long)]
    pub init: bool,

    /// Use global config (~/.minirpc/config.toml) instead of local
    #[arg(short, long)]
    pub global: bool,

    /// Overwrite an existing config file
    #[arg(short, long)]
    pub force: bool,
}

fn get_config_path(global: bool) -> PathBuf {
    if global {
        Config::global_config_path().unwrap_or_else(Config::local_config_path)
    } else {
        Config::local_config_path()
    }
}

pub fn run(args: ConfigArgs, config: &Config) -> Result<()> {
    if args.path {
        println!("Global: {}", get_config_path(true).display());
        println!("Local:  {}", get_config_path(false).display());
        match Config::find_local_config() {
            Some(active) => println!("Active: {}", active.display()),
            None => println!("No local config found"),
        }
        return Ok(());
    }

    if args.init {
        let config_path = get_config_path(args.global);
        if config_path.exists() && !args.force {
            bail!(
                "Config already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }
        Config::default()
            .save_to(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
