use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::http::headers::Headers;

/// Names a YAML configuration file.
pub const CONFIG_ENV: &str = "BEACON_CONFIG";
/// Overrides `server.listen_addr`.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    /// Added to every response that does not set the header itself.
    pub default_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// How often idle connections are stepped.
    pub poll_interval_ms: u64,
    pub max_connections: usize,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Per-connection limits and timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub receive_buffer_size: usize,
    pub max_request_line: usize,
    pub max_header_line: usize,
    pub max_headers: usize,
    pub max_body_size: usize,
    pub idle_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            connection: ConnectionConfig::default(),
            default_headers: BTreeMap::from([("Server".to_string(), "beacon".to_string())]),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            poll_interval_ms: 10,
            max_connections: 64,
            tls: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            receive_buffer_size: 512,
            max_request_line: 128,
            max_header_line: 384,
            max_headers: 20,
            max_body_size: 16 * 1024,
            idle_timeout_ms: 20_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl ConnectionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl ServerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load from the file named by `BEACON_CONFIG`, or defaults when unset,
    /// then apply the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let conn = &self.connection;
        if conn.receive_buffer_size == 0 {
            bail!("connection.receive_buffer_size must be greater than zero");
        }
        if conn.max_request_line == 0 || conn.max_header_line == 0 {
            bail!("connection line limits must be greater than zero");
        }
        if conn.max_headers == 0 {
            bail!("connection.max_headers must be greater than zero");
        }
        if conn.idle_timeout_ms == 0 {
            bail!("connection.idle_timeout_ms must be greater than zero");
        }
        if self.server.poll_interval_ms == 0 {
            bail!("server.poll_interval_ms must be greater than zero");
        }
        if self.server.max_connections == 0 {
            bail!("server.max_connections must be greater than zero");
        }
        Ok(())
    }

    pub fn default_headers(&self) -> Headers {
        self.default_headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()
    }
}
