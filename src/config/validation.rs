//! Configuration validation utilities.

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Check that `address` has the form `host:port`.
///
/// IPv6 literals must be bracketed (`[::1]:4730`). The host is not resolved.
///
/// # Examples
///
/// ```
/// use gearman_exporter::config::validate_host_port;
///
/// assert!(validate_host_port("127.0.0.1:4730").is_ok());
/// assert!(validate_host_port("gearman:4730").is_ok());
/// assert!(validate_host_port("[::1]:4730").is_ok());
/// assert!(validate_host_port("gearman").is_err());
/// ```
pub fn validate_host_port(address: &str) -> Result<(), String> {
    let (host, port) = if let Some(rest) = address.strip_prefix('[') {
        rest.split_once("]:")
            .ok_or_else(|| format!("invalid address '{address}': missing port"))?
    } else {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid address '{address}': missing port"))?;
        if host.contains(':') {
            return Err(format!("invalid address '{address}': too many colons"));
        }
        (host, port)
    };

    // An empty host cannot be resolved for an outbound connect.
    if host.is_empty() {
        return Err(format!("invalid address '{address}': missing host"));
    }

    match port.parse::<u16>() {
        Ok(0) => Err(format!("invalid address '{address}': port must be non-zero")),
        Ok(_) => Ok(()),
        Err(_) => Err(format!("invalid address '{address}': invalid port '{port}'")),
    }
}
