//! Configuration module
//!
//! `minirpc` reads a TOML file with a `[control]` table describing the RPC
//! listener and a `[debug]` table for log verbosity.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::rpc::server::DEFAULT_MAX_BODY_BYTES;
use crate::rpc::ServerConfig;

/// Directory holding a local config, searched upwards from the CWD
pub const CONFIG_DIR: &str = ".minirpc";
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// RPC control interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ControlConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Number of worker threads sharing the listening socket
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub allow_cors: bool,

    /// Seconds a client gets to send the request head, and then its body
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            workers: default_workers(),
            allow_cors: false,
            read_timeout_secs: default_read_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    10081
}

fn default_workers() -> usize {
    1
}

fn default_read_timeout_secs() -> u64 {
    10
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DebugConfig {
    /// 0 = info, 1 = debug, 2+ = trace
    #[serde(default)]
    pub level: u8,
}

impl Config {
    /// Load config from default locations
    pub fn load() -> Result<Self> {
        // Try local config first, then global
        if let Some(local) = Self::find_local_config() {
            return Self::load_from(&local);
        }

        if let Some(global) = Self::global_config_path() {
            if global.exists() {
                return Self::load_from(&global);
            }
        }

        Ok(Self::default())
    }

    /// Load from an explicit file, or fall back to discovery
    pub fn load_with(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_listen_address(&self.control.listen_address) {
            bail!(
                "invalid listen-address: {:?}",
                self.control.listen_address
            );
        }
        if self.control.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.control.read_timeout_secs == 0 {
            bail!("read-timeout-secs must be at least 1");
        }
        Ok(())
    }

    /// Settings handed to the RPC server at startup
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            address: self.control.listen_address.clone(),
            port: self.control.listen_port,
            worker_count: self.control.workers,
            allow_cors: self.control.allow_cors,
            read_timeout: Duration::from_secs(self.control.read_timeout_secs),
            max_body_bytes: self.control.max_body_bytes,
        }
    }

    /// Find local .minirpc/config.toml walking up directories
    pub fn find_local_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Get global config path (~/.minirpc/config.toml)
    pub fn global_config_path() -> Option<PathBuf> {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Path `config init` writes to
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
    }
}

/// An IP literal or a syntactically valid host name
pub fn is_valid_listen_address(address: &str) -> bool {
    if address.parse::<IpAddr>().is_ok() {
        return true;
    }

    if address.is_empty() || address.len() > 253 {
        return false;
    }

    // All-numeric labels look like a mistyped IPv4 address
    if address.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
        return false;
    }

    address.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.control.enabled);
        assert_eq!(config.control.listen_port, 10081);
        assert_eq!(config.control.workers, 1);
        assert!(!config.control.allow_cors);
    }

    #[test]
    fn test_parse_control_table() {
        let config = Config::parse(
            r#"
            [control]
            listen-address = "0.0.0.0"
            listen-port = 8080
            workers = 4
            allow-cors = true
            read-timeout-secs = 3
            max-body-bytes = 4096

            [debug]
            level = 2
            "#,
        )
        .unwrap();

        let server = config.server_config();
        assert_eq!(server.address, "0.0.0.0");
        assert_eq!(server.port, 8080);
        assert_eq!(server.worker_count, 4);
        assert!(server.allow_cors);
        assert_eq!(server.bind_address(), "0.0.0.0:8080");
        assert_eq!(server.read_timeout, Duration::from_secs(3));
        assert_eq!(server.max_body_bytes, 4096);
        assert_eq!(config.debug.level, 2);
    }

    #[test]
    fn test_rejects_out_of_range_port() {
        assert!(Config::parse("[control]\nlisten-port = 70000\n").is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        assert!(Config::parse("[control]\nworkers = 0\n").is_err());
    }

    #[test]
    fn test_rejects_zero_read_timeout() {
        assert!(Config::parse("[control]\nread-timeout-secs = 0\n").is_err());
    }

    #[test]
    fn test_control_enabled_by_default() {
        assert!(Config::parse("[control]\nlisten-port = 9000\n").unwrap().control.enabled);
        assert!(!Config::parse("[control]\nenabled = false\n").unwrap().control.enabled);
    }

    #[test]
    fn test_rejects_bad_address() {
        assert!(Config::parse("[control]\nlisten-address = \"300.1.1.1\"\n").is_err());
        assert!(Config::parse("[control]\nlisten-address = \"bad host\"\n").is_err());
    }

    #[test]
    fn test_listen_address_forms() {
        assert!(is_valid_listen_address("127.0.0.1"));
        assert!(is_valid_listen_address("::1"));
        assert!(is_valid_listen_address("localhost"));
        assert!(is_valid_listen_address("rpc-01.example.com"));
        assert!(!is_valid_listen_address(""));
        assert!(!is_valid_listen_address("1.2.3"));
        assert!(!is_valid_listen_address("-bad.example"));
        assert!(!is_valid_listen_address("a..b"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR).join(CONFIG_FILE);

        let mut config = Config::default();
        config.control.workers = 3;
        config.control.allow_cors = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
