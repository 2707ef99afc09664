//! Structured logging for tradews.
//!
//! - Pretty, human-readable output for development
//! - JSON lines for production (`RUST_ENV=production`)
//! - `RUST_LOG` filtering with a crate-wide default

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, LogFormat, LoggingConfig};
