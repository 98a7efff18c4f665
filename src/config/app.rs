//! Application configuration structures.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::gearman::GearmanConfig;

use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default metrics listen address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:9418";

/// Default graceful shutdown deadline (10 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix selecting a Unix domain socket listener.
pub const UNIX_LISTEN_PREFIX: &str = "unix:";

// =============================================================================
// Server Configuration
// =============================================================================

/// Where the metrics server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// TCP socket address, e.g. `127.0.0.1:9418`.
    Tcp(SocketAddr),
    /// Unix domain socket path, written as `unix:/run/gearman-exporter.sock`.
    Unix(PathBuf),
}

impl FromStr for ListenAddr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix(UNIX_LISTEN_PREFIX) {
            if path.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "invalid server listen address: '{s}': empty socket path"
                )));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        s.parse().map(Self::Tcp).map_err(|_| {
            ConfigError::ValidationError(format!("invalid server listen address: '{s}'"))
        })
    }
}

impl std::fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "http://{addr}"),
            Self::Unix(path) => write!(f, "{UNIX_LISTEN_PREFIX}{}", path.display()),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (default: "127.0.0.1:9418"). `unix:<path>` selects a
    /// Unix domain socket.
    pub listen: String,

    /// How long in-flight requests may drain on shutdown (default: 10s).
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

// =============================================================================
// Log Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directives, e.g. `info` or `info,gearman_exporter=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Upstream gearman configuration.
    pub gearman: GearmanConfig,

    /// Logging configuration.
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.server.shutdown_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "server shutdown_timeout must be positive".to_string(),
            ));
        }

        self.gearman.validate()?;

        EnvFilter::try_new(&self.log.level).map_err(|e| {
            ConfigError::ValidationError(format!("invalid log level '{}': {}", self.log.level, e))
        })?;

        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<ListenAddr, ConfigError> {
        self.server.listen.parse()
    }
}
