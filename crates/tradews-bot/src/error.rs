//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tradews_ws::WsError>),

    #[error("Key error: {0}")]
    Signer(#[from] tradews_auth::SignerError),

    #[error("Request error: {0}")]
    Core(#[from] tradews_core::CoreError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tradews_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tradews_ws::WsError> for AppError {
    fn from(e: tradews_ws::WsError) -> Self {
        Self::WebSocket(Box::new(e))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
