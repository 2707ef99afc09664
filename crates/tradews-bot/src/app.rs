//! Application wiring and the event loop.

use crate::cli::{self, Command};
use crate::config::AppConfig;
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};
use tradews_ws::{
    ErrorEvent, EventStreams, LoginResponse, OrderArrayResponse, OrderResponse, Resolve,
    StaticResolver, Target, TradingClient,
};

/// Capacity of each event channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The command-line application.
pub struct Application {
    config: AppConfig,
    client: Arc<TradingClient>,
}

impl Application {
    /// Load the signing key and build the client.
    ///
    /// Fails on a missing or malformed key before any connection is made.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let signer = config.private_key.load_signer()?;
        let client_config = config.client_config()?;

        let mut client = TradingClient::new(client_config.clone(), config.api_key.clone(), signer);
        if !config.service_ips.is_empty() {
            let target = Target::parse(&client_config.url)?;
            info!(host = %target.host, ips = ?config.service_ips, "Pinning service addresses");
            let resolver: Arc<dyn Resolve> =
                Arc::new(StaticResolver::new().with_host(target.host, config.service_ips.clone()));
            client = client.with_resolver(resolver);
        }

        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> &Arc<TradingClient> {
        &self.client
    }

    /// Execute `command` to completion.
    pub async fn execute(self, command: Command) -> AppResult<()> {
        match command {
            Command::Run => self.run().await,
            Command::Place(args) => {
                let wait = Duration::from_secs(args.wait_secs);
                let order = args.into_order()?;
                self.one_shot(wait, |client| async move { client.place_order(order).await })
                    .await
            }
            Command::Cancel {
                symbol,
                order_id,
                client_order_id,
                wait_secs,
            } => {
                let cancel = cli::cancel_request(symbol, order_id, client_order_id)?;
                self.one_shot(Duration::from_secs(wait_secs), |client| async move {
                    client.cancel_order(cancel).await
                })
                .await
            }
            Command::CancelAll { symbol, wait_secs } => {
                let cancel = cli::cancel_all_request(symbol);
                self.one_shot(Duration::from_secs(wait_secs), |client| async move {
                    client.cancel_all_open_orders(cancel).await
                })
                .await
            }
        }
    }

    /// Stay connected and authorized until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(endpoint = %self.config.endpoint, "Starting session");
        let mut events = self.client.subscribe(EVENT_CHANNEL_CAPACITY);

        self.client.wait_for_authorization().await?;
        info!("Session authorized, entering event loop");

        loop {
            tokio::select! {
                biased;

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(event) = events.errors.recv() => {
                    log_error(&event);
                    if matches!(event, ErrorEvent::Transport { .. }) {
                        self.reauthorize();
                    }
                }
                Some(login) = events.logins.recv() => log_login(&login),
                Some(order) = events.orders.recv() => log_order(&order),
                Some(batch) = events.order_batches.recv() => log_order_batch(&batch),
            }
        }

        self.client.shutdown();
        info!("Shut down");
        Ok(())
    }

    /// Reconnect and log in again in the background.
    fn reauthorize(&self) {
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.wait_for_authorization().await {
                Ok(()) => info!("Session re-authorized"),
                Err(e) => warn!(error = %e, "Re-authorization failed"),
            }
        });
    }

    /// Send one request, then log events for `wait`.
    async fn one_shot<F, Fut>(self, wait: Duration, send: F) -> AppResult<()>
    where
        F: FnOnce(Arc<TradingClient>) -> Fut,
        Fut: std::future::Future<Output = tradews_ws::WsResult<String>>,
    {
        let mut events = self.client.subscribe(EVENT_CHANNEL_CAPACITY);
        let request_id = send(self.client.clone()).await?;
        info!(request_id = %request_id, wait_secs = wait.as_secs(), "Request sent, awaiting responses");

        drain_events(&mut events, wait).await;
        self.client.shutdown();
        Ok(())
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.client.state())
            .finish()
    }
}

/// Log events until `wait` elapses or every stream closes.
async fn drain_events(events: &mut EventStreams, wait: Duration) {
    let deadline = Instant::now() + wait;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return,
            Some(event) = events.errors.recv() => log_error(&event),
            Some(login) = events.logins.recv() => log_login(&login),
            Some(order) = events.orders.recv() => log_order(&order),
            Some(batch) = events.order_batches.recv() => log_order_batch(&batch),
            else => return,
        }
    }
}

fn log_error(event: &ErrorEvent) {
    match event {
        ErrorEvent::Api(api) => warn!(
            request_id = ?api.id,
            status = ?api.status,
            code = api.error.code,
            msg = %api.error.msg,
            "Request rejected"
        ),
        ErrorEvent::Transport { direction, message } => {
            error!(%direction, %message, "Connection lost")
        }
    }
}

fn log_login(login: &LoginResponse) {
    match login.result.authorized_since {
        Some(authorized_since) => info!(
            request_id = ?login.id,
            authorized_since,
            server_time = login.result.server_time,
            "Logged in"
        ),
        None => info!(request_id = ?login.id, "Logged out"),
    }
}

fn log_order(order: &OrderResponse) {
    let r = &order.result;
    info!(
        request_id = ?order.id,
        symbol = %r.symbol,
        order_id = r.order_id,
        client_order_id = %r.client_order_id,
        status = %r.status,
        side = %r.side,
        price = %r.price,
        orig_qty = %r.orig_qty,
        executed_qty = %r.executed_qty,
        "Order update"
    );
}

fn log_order_batch(batch: &OrderArrayResponse) {
    info!(request_id = ?batch.id, count = batch.result.len(), "Order batch update");
    for r in &batch.result {
        info!(
            symbol = %r.symbol,
            order_id = r.order_id,
            client_order_id = %r.client_order_id,
            status = %r.status,
            "Order update"
        );
    }
}
