//! WebSocket client error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    /// Transport-level connection failure; retried by `connect()`.
    #[error("Dial failed (status {status:?}): {reason}")]
    DialFailed { status: Option<u16>, reason: String },

    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// Transmission failure; tears down the connection.
    #[error("Write failed: {0}")]
    Write(String),

    /// Reception failure; tears down the connection.
    #[error("Read failed: {0}")]
    Read(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Outbound channel closed")]
    ChannelClosed,

    #[error("Authorization not confirmed within {0:?}")]
    AuthorizationTimeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Resolve failed for {host}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Signing error: {0}")]
    Signing(#[from] tradews_auth::SignerError),

    #[error("Invalid request: {0}")]
    Request(#[from] tradews_core::CoreError),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WsResult<T> = Result<T, WsError>;
