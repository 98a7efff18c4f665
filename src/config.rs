//! Configuration module for the gearman exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (TCP or Unix socket listen address, shutdown deadline)
//! - Upstream gearman settings (address, timeouts)
//! - Log level

mod app;
mod validation;

pub use app::{AppConfig, ListenAddr, LogConfig, ServerConfig};
pub use validation::{ConfigError, validate_host_port};

// Re-export constants
pub use app::{DEFAULT_LISTEN, DEFAULT_LOG_LEVEL, DEFAULT_SHUTDOWN_TIMEOUT, UNIX_LISTEN_PREFIX};
