//! One-shot admin protocol client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{GearmanError, StatusSnapshot};
use crate::config::{ConfigError, validate_host_port};

/// Default gearman admin address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:4730";

/// Default connect timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default response read timeout (5 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

const VERSION_COMMAND: &str = "version";
const STATUS_COMMAND: &str = "status";

/// Line terminating a multi-line `status` response.
const SENTINEL: &str = ".";

/// Longest accepted response line, terminator included.
const MAX_LINE_LEN: u64 = 64 * 1024;

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

/// Connection settings for the upstream job server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearmanConfig {
    /// Upstream `host:port` (default: "127.0.0.1:4730").
    #[serde(default = "default_address")]
    pub address: String,
    /// Bound on establishing the TCP connection (default: 5s).
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Bound on reading the complete response (default: 5s).
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,
}

impl Default for GearmanConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl GearmanConfig {
    /// Create a configuration for the given `host:port`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Validate the configuration.
    ///
    /// The address must be `host:port` with a non-zero port. Host names are
    /// accepted and resolved on every connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_host_port(&self.address)
            .map_err(|e| ConfigError::ValidationError(format!("gearman address: {e}")))?;

        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "gearman connect_timeout must be positive".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "gearman read_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Client for the gearman admin protocol.
///
/// Holds configuration only. Each call opens a fresh connection which is
/// dropped, and therefore closed, on every return path.
#[derive(Debug, Clone)]
pub struct GearmanClient {
    config: GearmanConfig,
}

impl GearmanClient {
    pub fn new(config: GearmanConfig) -> Self {
        Self { config }
    }

    /// Upstream address this client connects to.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Query the server version.
    pub async fn get_version(&self) -> Result<String, GearmanError> {
        let mut conn = self.connect().await?;
        send_command(&mut conn, VERSION_COMMAND).await?;

        let line = timeout(self.config.read_timeout, read_line(&mut conn, VERSION_COMMAND))
            .await
            .map_err(|_| GearmanError::protocol(VERSION_COMMAND, "timed out reading response"))??
            .ok_or_else(|| {
                GearmanError::protocol(VERSION_COMMAND, "connection closed before a response line")
            })?;

        if let Some(reason) = line.strip_prefix("ERR ") {
            return Err(GearmanError::protocol(
                VERSION_COMMAND,
                format!("server returned error: {reason}"),
            ));
        }

        tracing::debug!(
            address = %self.config.address,
            version = %line,
            "gearman version received"
        );
        Ok(line)
    }

    /// Query the per-function queue status.
    ///
    /// The whole response must arrive, up to and excluding the `.` sentinel,
    /// before the read timeout. A single malformed line fails the call.
    pub async fn get_status(&self) -> Result<StatusSnapshot, GearmanError> {
        let mut conn = self.connect().await?;
        send_command(&mut conn, STATUS_COMMAND).await?;

        let lines = timeout(self.config.read_timeout, read_until_sentinel(&mut conn))
            .await
            .map_err(|_| GearmanError::protocol(STATUS_COMMAND, "timed out reading response"))??;

        let snapshot = StatusSnapshot::from_lines(lines.iter().map(String::as_str))?;
        tracing::debug!(
            address = %self.config.address,
            functions = snapshot.len(),
            "gearman status received"
        );
        Ok(snapshot)
    }

    async fn connect(&self) -> Result<BufReader<TcpStream>, GearmanError> {
        let address = &self.config.address;
        match timeout(self.config.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => Ok(BufReader::new(stream)),
            Ok(Err(source)) => Err(GearmanError::Connection {
                address: address.clone(),
                source,
            }),
            Err(_) => Err(GearmanError::ConnectTimeout {
                address: address.clone(),
            }),
        }
    }
}

async fn send_command(
    conn: &mut BufReader<TcpStream>,
    command: &'static str,
) -> Result<(), GearmanError> {
    let request = format!("{command}\n");
    conn.get_mut()
        .write_all(request.as_bytes())
        .await
        .map_err(|e| GearmanError::protocol(command, format!("write failed: {e}")))
}

/// Read one newline-terminated line with the terminator stripped.
///
/// Returns `None` when the peer closes before a complete line arrives.
/// Lines longer than [`MAX_LINE_LEN`] are a protocol error, invalid UTF-8
/// a parse error.
async fn read_line(
    conn: &mut BufReader<TcpStream>,
    command: &'static str,
) -> Result<Option<String>, GearmanError> {
    let mut buf = Vec::new();
    let read = (&mut *conn)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await
        .map_err(|e| GearmanError::protocol(command, format!("read failed: {e}")))?;

    if buf.last() != Some(&b'\n') {
        if read as u64 == MAX_LINE_LEN {
            return Err(GearmanError::protocol(
                command,
                format!("response line exceeds {MAX_LINE_LEN} bytes"),
            ));
        }
        return Ok(None);
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf).map(Some).map_err(|e| {
        let line = String::from_utf8_lossy(e.as_bytes()).into_owned();
        GearmanError::parse(line, "invalid UTF-8")
    })
}

async fn read_until_sentinel(conn: &mut BufReader<TcpStream>) -> Result<Vec<String>, GearmanError> {
    let mut lines = Vec::new();
    loop {
        match read_line(conn, STATUS_COMMAND).await? {
            Some(line) if line == SENTINEL => return Ok(lines),
            Some(line) => lines.push(line),
            None => {
                return Err(GearmanError::protocol(
                    STATUS_COMMAND,
                    format!("connection closed after {} lines without terminator", lines.len()),
                ));
            }
        }
    }
}
