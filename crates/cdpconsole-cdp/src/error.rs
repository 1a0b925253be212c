//! CDP error types.

use thiserror::Error;

use crate::transport::TransportError;

/// CDP client errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Failed to connect to the debug target.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport error after the channel was established.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// CDP protocol error.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A correlated request received no reply in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The session was closed before the request resolved.
    #[error("Session closed")]
    Cancelled,

    /// Invalid response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A session task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CdpError {
    /// Whether this error is a per-request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CdpError::Timeout(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::Transport(TransportError::from(e))
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}
