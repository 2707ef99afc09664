//! Authenticated WebSocket trading client.
//!
//! Provides a single long-lived, self-healing connection to a trading
//! WebSocket API with:
//! - Automatic redial on a fixed interval, local egress binding, custom
//!   name resolution and environment proxy fallback
//! - Session logon signed with Ed25519, throttled re-login and stale
//!   confirmation handling
//! - A FIFO outbound queue with write deadlines and idle keepalive pings
//! - Shape-based classification of inbound frames, routed by a bounded
//!   worker pool onto consumer channels
//!
//! The entry point is [`TradingClient`].

pub mod authenticator;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod message;
pub mod proxy;
pub mod receiver;
pub mod request_id;
pub mod resolver;
pub mod sender;
pub mod session;
pub mod transport;

pub use client::TradingClient;
pub use config::ClientConfig;
pub use connection::ConnectionState;
pub use error::{WsError, WsResult};
pub use events::{Direction, ErrorEvent, EventStreams};
pub use message::{
    classify, classify_text, methods, ApiError, DropReason, EnvelopeShape, ErrorDetail, Inbound,
    LoginResponse, LoginResult, OrderArrayResponse, OrderResponse, OrderResult, RateLimit,
    RequestEnvelope,
};
pub use proxy::{ProxyMode, ProxySettings};
pub use request_id::RequestIdAllocator;
pub use resolver::{BoxFuture, Resolve, StaticResolver, SystemResolver};
pub use sender::Outbound;
pub use session::{AuthState, LoginConfirmation, Session};
pub use transport::{Dialer, Target, WsStream};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
///
/// Called by the client before its first dial; safe to call repeatedly.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
