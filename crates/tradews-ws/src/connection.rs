//! Connection manager.
//!
//! Owns at most one live connection. `connect()` returns it, or dials a new
//! one on a fixed redial interval until it succeeds or the client shuts
//! down. Each connection runs a sender, a receiver and a dispatch pool; the
//! sender and receiver fail together, and the first failure is published on
//! the error channel.

use crate::authenticator::Authenticator;
use crate::config::ClientConfig;
use crate::dispatch::{self, InboundFrame};
use crate::error::{WsError, WsResult};
use crate::events::{Direction, ErrorEvent, EventSinks};
use crate::heartbeat::Heartbeat;
use crate::receiver::run_receiver;
use crate::resolver::Resolve;
use crate::sender::{run_sender, Outbound};
use crate::session::Session;
use crate::transport::{Dialer, WsStream};
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex as TokioMutex};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, info, warn};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// State shared by the client and every connection task.
#[derive(Debug)]
pub(crate) struct Shared {
    pub config: Arc<ClientConfig>,
    pub sinks: EventSinks,
    pub authenticator: Authenticator,
    pub shutdown: CancellationToken,
    state_tx: watch::Sender<ConnectionState>,
    current_link: Mutex<u64>,
}

impl Shared {
    pub fn new(config: Arc<ClientConfig>, authenticator: Authenticator) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            sinks: EventSinks::new(config.publish_timeout()),
            config,
            authenticator,
            shutdown: CancellationToken::new(),
            state_tx,
            current_link: Mutex::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    fn mark_connected(&self, link_id: u64) {
        let mut current = self.current_link.lock();
        *current = link_id;
        self.set_state(ConnectionState::Connected);
    }

    /// Only the current link may flip the state to disconnected.
    fn mark_disconnected(&self, link_id: u64) {
        let current = self.current_link.lock();
        if *current == link_id {
            self.set_state(ConnectionState::Disconnected);
        }
    }
}

/// One live connection: its queues, session and cancellation.
#[derive(Debug)]
pub(crate) struct Link {
    id: u64,
    session: Session,
    heartbeat: Heartbeat,
    outbound: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
    open: AtomicBool,
}

impl Link {
    pub fn new(id: u64, outbound: mpsc::Sender<Outbound>, cancel: CancellationToken) -> Self {
        Self {
            id,
            session: Session::new(),
            heartbeat: Heartbeat::new(),
            outbound,
            cancel,
            open: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    pub fn outbound(&self) -> &mpsc::Sender<Outbound> {
        &self.outbound
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Append to the FIFO outbound queue, waiting while it is full.
    pub async fn enqueue(&self, item: Outbound) -> WsResult<()> {
        if !self.is_open() {
            return Err(WsError::ChannelClosed);
        }
        self.outbound
            .send(item)
            .await
            .map_err(|_| WsError::ChannelClosed)
    }

    /// Close the link and forget its authorization.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        self.session.reset();
        self.cancel.cancel();
        was_open
    }
}

/// Dials and supervises connections.
#[derive(Debug)]
pub(crate) struct ConnectionManager {
    shared: Arc<Shared>,
    dialer: Dialer,
    current: RwLock<Option<Arc<Link>>>,
    dial_lock: TokioMutex<()>,
    next_link_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new(shared: Arc<Shared>, resolver: Arc<dyn Resolve>) -> Self {
        Self {
            dialer: Dialer::new(Arc::clone(&shared.config), resolver),
            shared,
            current: RwLock::new(None),
            dial_lock: TokioMutex::new(()),
            next_link_id: AtomicU64::new(1),
        }
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn Resolve>) {
        self.dialer = Dialer::new(Arc::clone(&self.shared.config), resolver);
    }

    /// The current connection, if it is still open.
    pub fn live_link(&self) -> Option<Arc<Link>> {
        self.current
            .read()
            .as_ref()
            .filter(|link| link.is_open())
            .cloned()
    }

    /// Return the live connection, dialing until one is established.
    ///
    /// Concurrent callers share one dial. Fails only with `Cancelled` once
    /// the client shuts down.
    pub async fn connect(&self) -> WsResult<Arc<Link>> {
        if let Some(link) = self.live_link() {
            return Ok(link);
        }

        let _guard = self.dial_lock.lock().await;
        if let Some(link) = self.live_link() {
            return Ok(link);
        }
        if let Some(stale) = self.current.write().take() {
            stale.close();
        }

        let shutdown = &self.shared.shutdown;
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                self.shared.set_state(ConnectionState::Disconnected);
                return Err(WsError::Cancelled);
            }

            self.shared.set_state(if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });
            attempt = attempt.saturating_add(1);

            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => continue,
                result = self.dialer.dial() => result,
            };

            match result {
                Ok(stream) => return Ok(self.establish(stream)),
                Err(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        retry_in_ms = self.shared.config.redial_interval_ms,
                        "Dial failed, retrying"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(self.shared.config.redial_interval()) => {}
                    }
                }
            }
        }
    }

    fn establish(&self, stream: WsStream) -> Arc<Link> {
        let config = Arc::clone(&self.shared.config);
        let link_id = self.next_link_id.fetch_add(1, Ordering::Relaxed);

        let (sink, source) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity.max(1));
        let (dispatch_tx, dispatch_rx) =
            mpsc::channel::<InboundFrame>(config.dispatch_queue_capacity.max(1));

        let link = Arc::new(Link::new(
            link_id,
            outbound_tx,
            self.shared.shutdown.child_token(),
        ));

        // Must be current before the tasks start: `mark_disconnected` ignores other links.
        *self.current.write() = Some(Arc::clone(&link));
        self.shared.mark_connected(link_id);
        info!(link = link_id, url = %config.url, "Connection established");

        tokio::spawn({
            let link = Arc::clone(&link);
            let shared = Arc::clone(&self.shared);
            let config = Arc::clone(&config);
            async move {
                let result = run_sender(Arc::clone(&link), outbound_rx, sink, config).await;
                supervise(Direction::Outbound, result, &link, &shared).await;
            }
        });

        tokio::spawn({
            let link = Arc::clone(&link);
            let shared = Arc::clone(&self.shared);
            async move {
                let result = run_receiver(Arc::clone(&link), source, dispatch_tx).await;
                supervise(Direction::Inbound, result, &link, &shared).await;
            }
        });

        dispatch::spawn_workers(
            config.dispatch_workers,
            dispatch_rx,
            Arc::clone(&link),
            Arc::clone(&self.shared),
        );

        link
    }
}

/// Tear the link down after either half exits.
///
/// The half that fails first closes the link, which stops its sibling, and
/// publishes the failure unless the link was already being shut down.
async fn supervise(direction: Direction, result: WsResult<()>, link: &Link, shared: &Shared) {
    let deliberate = link.cancel.is_cancelled();
    let first = link.close();
    if first {
        shared.mark_disconnected(link.id);
    }

    match result {
        Err(e) if first && !deliberate => {
            error!(link = link.id, %direction, error = %e, "Connection failed");
            shared
                .sinks
                .publish_error(ErrorEvent::Transport {
                    direction,
                    message: e.to_string(),
                })
                .await;
        }
        Err(e) => debug!(link = link.id, %direction, error = %e, "Connection task ended during shutdown"),
        Ok(()) => debug!(link = link.id, %direction, "Connection task ended"),
    }
}
