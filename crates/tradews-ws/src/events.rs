//! Consumer-facing event channels.
//!
//! Each event kind has its own optional channel. Nothing is published to a
//! kind without a registered channel. Callers that do not hold the error
//! stream will not observe transport failures.

use crate::message::{ApiError, LoginResponse, OrderArrayResponse, OrderResponse};
use parking_lot::RwLock;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Which half of the connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

/// Something went wrong, either at the server or on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEvent {
    /// The server rejected a request. The connection stays up.
    Api(ApiError),
    /// A read or write failed and the connection was torn down.
    Transport { direction: Direction, message: String },
}

/// Receiving ends handed to the caller by `subscribe`.
#[derive(Debug)]
pub struct EventStreams {
    pub errors: mpsc::Receiver<ErrorEvent>,
    pub logins: mpsc::Receiver<LoginResponse>,
    pub orders: mpsc::Receiver<OrderResponse>,
    pub order_batches: mpsc::Receiver<OrderArrayResponse>,
}

#[derive(Debug, Default, Clone)]
struct Senders {
    errors: Option<mpsc::Sender<ErrorEvent>>,
    logins: Option<mpsc::Sender<LoginResponse>>,
    orders: Option<mpsc::Sender<OrderResponse>>,
    order_batches: Option<mpsc::Sender<OrderArrayResponse>>,
}

/// Publishing side of the event channels.
#[derive(Debug)]
pub(crate) struct EventSinks {
    senders: RwLock<Senders>,
    publish_timeout: Duration,
}

impl EventSinks {
    pub fn new(publish_timeout: Duration) -> Self {
        Self {
            senders: RwLock::new(Senders::default()),
            publish_timeout,
        }
    }

    /// Replace all channels with fresh ones of `capacity`.
    pub fn subscribe(&self, capacity: usize) -> EventStreams {
        let capacity = capacity.max(1);
        let (errors_tx, errors) = mpsc::channel(capacity);
        let (logins_tx, logins) = mpsc::channel(capacity);
        let (orders_tx, orders) = mpsc::channel(capacity);
        let (batches_tx, order_batches) = mpsc::channel(capacity);

        *self.senders.write() = Senders {
            errors: Some(errors_tx),
            logins: Some(logins_tx),
            orders: Some(orders_tx),
            order_batches: Some(batches_tx),
        };

        EventStreams {
            errors,
            logins,
            orders,
            order_batches,
        }
    }

    pub fn set_errors(&self, tx: Option<mpsc::Sender<ErrorEvent>>) {
        self.senders.write().errors = tx;
    }

    pub fn set_logins(&self, tx: Option<mpsc::Sender<LoginResponse>>) {
        self.senders.write().logins = tx;
    }

    pub fn set_orders(&self, tx: Option<mpsc::Sender<OrderResponse>>) {
        self.senders.write().orders = tx;
    }

    pub fn set_order_batches(&self, tx: Option<mpsc::Sender<OrderArrayResponse>>) {
        self.senders.write().order_batches = tx;
    }

    pub async fn publish_error(&self, event: ErrorEvent) {
        let tx = self.senders.read().errors.clone();
        self.publish("error", tx, event).await;
    }

    pub async fn publish_login(&self, event: LoginResponse) {
        let tx = self.senders.read().logins.clone();
        self.publish("login", tx, event).await;
    }

    pub async fn publish_order(&self, event: OrderResponse) {
        let tx = self.senders.read().orders.clone();
        self.publish("order", tx, event).await;
    }

    pub async fn publish_order_batch(&self, event: OrderArrayResponse) {
        let tx = self.senders.read().order_batches.clone();
        self.publish("order_batch", tx, event).await;
    }

    async fn publish<T>(&self, kind: &'static str, tx: Option<mpsc::Sender<T>>, event: T) {
        let Some(tx) = tx else {
            debug!(kind, "No consumer registered, event discarded");
            return;
        };
        match tx.send_timeout(event, self.publish_timeout).await {
            Ok(()) => {}
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                warn!(
                    kind,
                    timeout_ms = self.publish_timeout.as_millis() as u64,
                    "Consumer too slow, event dropped"
                );
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                debug!(kind, "Consumer dropped, event discarded");
            }
        }
    }
}
