//! Gearman client error types.

use thiserror::Error;

/// Errors returned by [`GearmanClient`](super::GearmanClient) calls.
///
/// The variants separate "could not reach the server" from "reached it but
/// the answer was unusable", which is what the collector logs on failure.
#[derive(Debug, Error)]
pub enum GearmanError {
    /// The TCP connection could not be established.
    #[error("failed to connect to gearman at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The connect phase did not finish before the connect timeout.
    #[error("timed out connecting to gearman at {address}")]
    ConnectTimeout { address: String },

    /// The connection was up but the expected response was not received.
    #[error("protocol error on `{command}`: {reason}")]
    Protocol {
        command: &'static str,
        reason: String,
    },

    /// A response line did not have the expected shape.
    #[error("failed to parse line {line:?}: {reason}")]
    Parse { line: String, reason: String },
}

impl GearmanError {
    pub(crate) fn protocol(command: &'static str, reason: impl Into<String>) -> Self {
        Self::Protocol {
            command,
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    /// True for failures to establish the connection at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ConnectTimeout { .. })
    }
}
