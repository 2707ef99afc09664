//! Command-line trading client.
//!
//! Wires configuration, key loading and logging to a
//! [`TradingClient`](tradews_ws::TradingClient):
//! - `run`: stay connected and authorized, logging every event
//! - `place`, `cancel`, `cancel-all`: send one request and report responses

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::Application;
pub use cli::{Args, Command, PlaceArgs};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
