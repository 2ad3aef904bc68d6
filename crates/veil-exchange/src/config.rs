//! Exchange and backend-selection configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use veil_core::{Error, Result};

/// Which payload-exchange backend to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// No backend; private calls fail fast.
    Disabled,
    /// In-memory content-addressed store (tests, single node).
    Memory,
    /// External exchange node over its Unix domain socket.
    Socket,
}

/// Per-request timeout bounds, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    /// Connection establishment.
    #[serde(default = "Timeouts::default_connect_ms")]
    pub connect_ms: u64,
    /// Request completion (write and body read).
    #[serde(default = "Timeouts::default_request_ms")]
    pub request_ms: u64,
    /// Wait for response headers.
    #[serde(default = "Timeouts::default_response_header_ms")]
    pub response_header_ms: u64,
}

impl Timeouts {
    fn default_connect_ms() -> u64 {
        1_000
    }

    fn default_request_ms() -> u64 {
        5_000
    }

    fn default_response_header_ms() -> u64 {
        5_000
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn response_header(&self) -> Duration {
        Duration::from_millis(self.response_header_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_ms: Self::default_connect_ms(),
            request_ms: Self::default_request_ms(),
            response_header_ms: Self::default_response_header_ms(),
        }
    }
}

/// Connection settings for the external exchange node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Path to the node's Unix domain socket.
    pub socket_path: PathBuf,
    /// Path to the file holding the local endpoint's base64 public key.
    pub identity_file: PathBuf,
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Top-level manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub backend: Backend,
    #[serde(default)]
    pub exchange: Option<ExchangeConfig>,
}

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ManagerConfig =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }
}
