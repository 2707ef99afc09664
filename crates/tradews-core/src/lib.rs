//! Core domain types for the tradews trading client.
//!
//! This crate provides the vocabulary shared by the transport and the
//! application:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `OrderSide`, `OrderType`, `TimeInForce`: Trading enums
//! - `PlaceOrder`, `CancelOrder`, `CancelAllOrders`: Order request parameters
//! - `Endpoint`: Trading WebSocket API endpoint catalogue

pub mod decimal;
pub mod endpoint;
pub mod error;
pub mod order;
pub mod request;

pub use decimal::{Price, Size};
pub use endpoint::Endpoint;
pub use error::{CoreError, Result};
pub use order::{ClientOrderId, OrderSide, OrderType, PositionSide, ResponseType, TimeInForce};
pub use request::{now_ms, CancelAllOrders, CancelOrder, PlaceOrder};
