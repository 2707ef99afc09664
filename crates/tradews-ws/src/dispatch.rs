//! Inbound routing pool.
//!
//! A fixed set of workers pulls frames from the connection's bounded
//! dispatch queue, classifies them and publishes to consumers. With more than
//! one worker, consumers may observe events out of arrival order.

use crate::connection::{Link, Shared};
use crate::events::ErrorEvent;
use crate::message::{classify, EnvelopeShape, Inbound};
use crate::session::LoginConfirmation;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A text frame waiting to be routed.
#[derive(Debug)]
pub struct InboundFrame {
    pub shape: EnvelopeShape,
    pub text: String,
    pub received_at: Instant,
}

/// Start `workers` routing tasks on `rx`.
///
/// Workers exit once the queue is closed and drained, so frames already
/// accepted are still routed after the connection goes down.
pub(crate) fn spawn_workers(
    workers: usize,
    rx: mpsc::Receiver<InboundFrame>,
    link: Arc<Link>,
    shared: Arc<Shared>,
) {
    let rx = Arc::new(TokioMutex::new(rx));
    for worker in 0..workers.max(1) {
        let rx = Arc::clone(&rx);
        let link = Arc::clone(&link);
        let shared = Arc::clone(&shared);
        tokio::spawn(async move {
            loop {
                let frame = { rx.lock().await.recv().await };
                let Some(frame) = frame else {
                    break;
                };
                route(frame, &link, &shared).await;
            }
            debug!(link = link.id(), worker, "Dispatch worker stopped");
        });
    }
}

/// Classify one frame and act on it.
pub(crate) async fn route(frame: InboundFrame, link: &Arc<Link>, shared: &Shared) {
    let inbound = match classify(frame.shape, &frame.text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(link = link.id(), error = %e, len = frame.text.len(), "Undecodable inbound message dropped");
            return;
        }
    };

    match inbound {
        Inbound::Error(error) => {
            warn!(
                link = link.id(),
                request_id = ?error.id,
                status = ?error.status,
                code = error.error.code,
                msg = %error.error.msg,
                "Request rejected"
            );
            shared.sinks.publish_error(ErrorEvent::Api(error)).await;
        }
        Inbound::Login(login) if login.result.authorized_since.is_none() => {
            link.session().reset();
            info!(link = link.id(), request_id = ?login.id, "Session logged out");
            warn_on_status(login.status, login.id.as_deref());
            shared.sinks.publish_login(login).await;
        }
        Inbound::Login(login) => {
            let window = shared.config.login_confirmation_window();
            match link.session().confirm_login(frame.received_at, window) {
                LoginConfirmation::Accepted { first } => {
                    if first {
                        info!(
                            link = link.id(),
                            authorized_since = ?login.result.authorized_since,
                            "Session authorized"
                        );
                    }
                    warn_on_status(login.status, login.id.as_deref());
                    shared.sinks.publish_login(login).await;
                }
                LoginConfirmation::Stale => {
                    debug!(link = link.id(), "Stale logon confirmation, logging in again");
                    if let Err(e) = shared.authenticator.login(link).await {
                        warn!(link = link.id(), error = %e, "Re-login failed");
                    }
                }
            }
        }
        Inbound::Order(order) => {
            warn_on_status(order.status, order.id.as_deref());
            debug!(
                request_id = ?order.id,
                symbol = %order.result.symbol,
                status = %order.result.status,
                "Order response"
            );
            shared.sinks.publish_order(order).await;
        }
        Inbound::OrderArray(batch) => {
            warn_on_status(batch.status, batch.id.as_deref());
            debug!(request_id = ?batch.id, count = batch.result.len(), "Order array response");
            shared.sinks.publish_order_batch(batch).await;
        }
        Inbound::Dropped(reason) => {
            debug!(link = link.id(), %reason, "Inbound message not routed");
        }
    }
}

fn warn_on_status(status: Option<u16>, request_id: Option<&str>) {
    if let Some(status) = status.filter(|s| *s != 200) {
        warn!(status, request_id, "Non-200 response status");
    }
}
