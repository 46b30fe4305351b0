//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via BIDS_CONFIG or --config)
//! 3. Environment variables

use crate::session::DEFAULT_OUTBOUND_QUEUE;
use bids_protocol::{DEFAULT_PORT, MAX_LINE_BYTES};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Keepalive configuration.
    pub keepalive: KeepaliveConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("BIDS_CONFIG") {
            Ok(path) => Self::load_from(path),
            Err(_) => {
                let config = Self::from_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Loads the given YAML file, then applies environment variable overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.network.apply_overrides(&lookup);
        self.keepalive.apply_overrides(&lookup);
        self.auth.apply_overrides(&lookup);
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_line_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "network.max_line_bytes must be at least 1".to_string(),
            ));
        }
        if self.network.outbound_queue == 0 {
            return Err(ConfigError::ValidationError(
                "network.outbound_queue must be at least 1".to_string(),
            ));
        }
        if self.network.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "network.write_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.keepalive.ping_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "keepalive.ping_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.keepalive.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "keepalive.tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.keepalive.max_missed == 0 {
            return Err(ConfigError::ValidationError(
                "keepalive.max_missed must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Longest accepted request line, excluding the newline.
    pub max_line_bytes: usize,
    /// Lines queued for one client before it is treated as stalled.
    pub outbound_queue: usize,
    /// Longest a single socket write may block, in milliseconds.
    pub write_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1000,
            max_line_bytes: MAX_LINE_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            write_timeout_ms: 5_000,
        }
    }
}

impl NetworkConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("BIDS_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Some(max) = lookup("BIDS_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }

        if let Some(max) = lookup("BIDS_MAX_LINE_BYTES") {
            if let Ok(n) = max.parse() {
                self.max_line_bytes = n;
            }
        }

        if let Some(max) = lookup("BIDS_OUTBOUND_QUEUE") {
            if let Ok(n) = max.parse() {
                self.outbound_queue = n;
            }
        }

        if let Some(ms) = lookup("BIDS_WRITE_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                self.write_timeout_ms = ms;
            }
        }
    }

    /// Returns the write timeout as Duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// Keepalive configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Expected interval between client messages, in milliseconds.
    pub ping_interval_ms: u64,
    /// Missed intervals after which a session is evicted.
    pub max_missed: u32,
    /// Period of the auction and keepalive sweeps, in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: 15_000,
            max_missed: 5,
            tick_interval_ms: 1_000,
        }
    }
}

impl KeepaliveConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("BIDS_PING_INTERVAL_MS") {
            if let Ok(ms) = ms.parse() {
                self.ping_interval_ms = ms;
            }
        }

        if let Some(max) = lookup("BIDS_MAX_MISSED_PINGS") {
            if let Ok(n) = max.parse() {
                self.max_missed = n;
            }
        }

        if let Some(ms) = lookup("BIDS_TICK_MS") {
            if let Ok(ms) = ms.parse() {
                self.tick_interval_ms = ms;
            }
        }
    }

    /// Returns the ping interval as Duration.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Returns the sweep period as Duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Credential mismatches tolerated on one connection before it is closed.
    pub max_failures: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { max_failures: 3 }
    }
}

impl AuthConfig {
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(max) = lookup("BIDS_MAX_AUTH_FAILURES") {
            if let Ok(n) = max.parse() {
                self.max_failures = n;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
