//! Public client facade.
//!
//! # Events
//!
//! Responses are not returned from `send()`; they arrive on the channels
//! handed out by [`TradingClient::subscribe`]. Correlate by the `id` carried
//! on each event. With several dispatch workers, events may be observed out
//! of arrival order; configure one worker to preserve it.
//!
//! Transport failures are only reported on the error stream. Callers that
//! drop it will not see them, but can watch [`TradingClient::state_watch`]
//! for the connection going down.

use crate::authenticator::Authenticator;
use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, ConnectionState, Link, Shared};
use crate::error::{WsError, WsResult};
use crate::events::{ErrorEvent, EventStreams};
use crate::message::{
    methods, LoginResponse, OrderArrayResponse, OrderResponse, RequestEnvelope,
};
use crate::request_id::RequestIdAllocator;
use crate::resolver::{Resolve, SystemResolver};
use crate::sender::Outbound;
use crate::session::AuthState;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use tradews_auth::Ed25519Signer;
use tradews_core::{CancelAllOrders, CancelOrder, PlaceOrder};

/// Authenticated, self-healing trading WebSocket client.
///
/// Share it between tasks behind an `Arc`. Dropping the client shuts it
/// down.
#[derive(Debug)]
pub struct TradingClient {
    shared: Arc<Shared>,
    connections: ConnectionManager,
    request_ids: Arc<RequestIdAllocator>,
}

impl TradingClient {
    /// Create a client. Nothing is dialed until the first call that needs a
    /// connection.
    pub fn new(config: ClientConfig, api_key: impl Into<String>, signer: Ed25519Signer) -> Self {
        let config = Arc::new(config);
        let request_ids = Arc::new(RequestIdAllocator::new());
        let authenticator = Authenticator::new(
            api_key.into(),
            signer,
            config.recv_window_ms,
            config.login_throttle(),
            Arc::clone(&request_ids),
        );
        let shared = Arc::new(Shared::new(config, authenticator));
        let connections = ConnectionManager::new(Arc::clone(&shared), Arc::new(SystemResolver));

        Self {
            shared,
            connections,
            request_ids,
        }
    }

    /// Resolve host names with `resolver` instead of the system resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.connections.set_resolver(resolver);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Register fresh channels for every event kind, replacing any
    /// previously registered ones.
    pub fn subscribe(&self, capacity: usize) -> EventStreams {
        self.shared.sinks.subscribe(capacity)
    }

    pub fn set_error_channel(&self, tx: Option<mpsc::Sender<ErrorEvent>>) {
        self.shared.sinks.set_errors(tx);
    }

    pub fn set_login_channel(&self, tx: Option<mpsc::Sender<LoginResponse>>) {
        self.shared.sinks.set_logins(tx);
    }

    pub fn set_order_channel(&self, tx: Option<mpsc::Sender<OrderResponse>>) {
        self.shared.sinks.set_orders(tx);
    }

    pub fn set_order_batch_channel(&self, tx: Option<mpsc::Sender<OrderArrayResponse>>) {
        self.shared.sinks.set_order_batches(tx);
    }

    /// Ensure a live connection, dialing until one is up.
    ///
    /// Returns `Err(WsError::Cancelled)` once the client is shut down.
    /// Dropping the future abandons the attempt.
    pub async fn connect(&self) -> WsResult<()> {
        self.connections.connect().await.map(|_| ())
    }

    /// Send a logon unless the session is authorized or one was sent within
    /// the throttle window.
    pub async fn login(&self) -> WsResult<()> {
        let link = self.connections.connect().await?;
        self.shared.authenticator.login(&link).await
    }

    /// Wait until the session is authorized, sending (throttled) logons
    /// meanwhile.
    ///
    /// # Errors
    ///
    /// - `WsError::AuthorizationTimeout` if not authorized in time
    /// - `WsError::ConnectionClosed` if the connection drops while waiting
    /// - `WsError::Cancelled` if the client shuts down
    pub async fn wait_for_authorization(&self) -> WsResult<()> {
        let link = self.connections.connect().await?;
        self.wait_authorized_on(&link).await
    }

    async fn wait_authorized_on(&self, link: &Link) -> WsResult<()> {
        let config = &self.shared.config;
        let timeout = config.auth_timeout();
        let deadline = Instant::now() + timeout;
        let mut poll = tokio::time::interval(config.auth_poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if link.session().is_authorized() {
                return Ok(());
            }
            if !link.is_open() {
                return Err(closed_while_waiting());
            }
            if Instant::now() >= deadline {
                warn!(link = link.id(), timeout_ms = config.auth_timeout_ms, "Authorization timed out");
                return Err(WsError::AuthorizationTimeout(timeout));
            }

            if let Err(e) = self.shared.authenticator.login(link).await {
                return Err(if link.is_open() { e } else { closed_while_waiting() });
            }

            tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => return Err(WsError::Cancelled),
                _ = poll.tick() => {}
            }
        }
    }

    /// Queue a request and return its ID.
    ///
    /// Any method other than the logon first waits for a connection and an
    /// authorized session. `extras` become top-level envelope fields; keys
    /// colliding with `id`, `method` or `params` are ignored. Returns once
    /// the request is queued; the response arrives on the event channels.
    pub async fn send(
        &self,
        method: &str,
        params: Map<String, Value>,
        extras: BTreeMap<String, String>,
    ) -> WsResult<String> {
        let link = self.connections.connect().await?;
        if method != methods::SESSION_LOGON {
            self.wait_authorized_on(&link).await?;
        }

        let request_id = self.request_ids.next_id();
        let (envelope, skipped) =
            RequestEnvelope::new(request_id.clone(), method, params).with_extras(extras);
        if !skipped.is_empty() {
            warn!(request_id = %request_id, ?skipped, "Ignoring extras that collide with envelope fields");
        }

        let payload = envelope.to_json()?;
        link.enqueue(Outbound::Text {
            request_id: request_id.clone(),
            method: method.to_string(),
            payload,
        })
        .await?;

        debug!(request_id = %request_id, method, "Request queued");
        Ok(request_id)
    }

    /// `order.place`
    pub async fn place_order(&self, order: PlaceOrder) -> WsResult<String> {
        let client_order_id = order.new_client_order_id.clone();
        let request_id = self
            .send(methods::ORDER_PLACE, order.into_params()?, BTreeMap::new())
            .await?;
        info!(request_id = %request_id, client_order_id = %client_order_id, "Order placed");
        Ok(request_id)
    }

    /// `order.cancel`
    pub async fn cancel_order(&self, cancel: CancelOrder) -> WsResult<String> {
        self.send(methods::ORDER_CANCEL, cancel.into_params()?, BTreeMap::new())
            .await
    }

    /// `openOrders.cancelAll`
    pub async fn cancel_all_open_orders(&self, cancel: CancelAllOrders) -> WsResult<String> {
        self.send(
            methods::OPEN_ORDERS_CANCEL_ALL,
            cancel.into_params()?,
            BTreeMap::new(),
        )
        .await
    }

    pub fn is_connected(&self) -> bool {
        self.connections.live_link().is_some()
    }

    pub fn is_authorized(&self) -> bool {
        self.connections
            .live_link()
            .is_some_and(|link| link.session().is_authorized())
    }

    pub fn auth_state(&self) -> AuthState {
        self.connections
            .live_link()
            .map_or(AuthState::Unauthenticated, |link| link.session().auth_state())
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Observe connection state transitions.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_watch()
    }

    /// Close the connection and stop all tasks. Later calls that need a
    /// connection fail with `Cancelled`.
    pub fn shutdown(&self) {
        if !self.shared.shutdown.is_cancelled() {
            info!("Shutting down trading client");
        }
        self.shared.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }
}

impl Drop for TradingClient {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

fn closed_while_waiting() -> WsError {
    WsError::ConnectionClosed {
        code: 1006,
        reason: "connection closed while waiting for authorization".to_string(),
    }
}
