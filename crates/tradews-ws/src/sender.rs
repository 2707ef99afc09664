//! Outbound dispatcher.
//!
//! Drains the connection's FIFO queue onto the socket, one frame at a time,
//! each under a write deadline. A periodic tick schedules a keepalive ping
//! when the connection has been idle.

use crate::config::ClientConfig;
use crate::connection::Link;
use crate::error::{WsError, WsResult};
use crate::transport::WsStream;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

/// One item of the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized request envelope.
    Text {
        request_id: String,
        method: String,
        payload: String,
    },
    /// Sentinel asking the sender to write a ping control frame.
    Keepalive,
}

pub(crate) type WsSink = SplitSink<WsStream, Message>;

/// Run until the link is cancelled or a write fails.
///
/// Returns `Ok(())` on cancellation, after a best-effort close frame.
pub(crate) async fn run_sender(
    link: Arc<Link>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    mut sink: WsSink,
    config: Arc<ClientConfig>,
) -> WsResult<()> {
    let mut tick = tokio::time::interval(config.sender_tick());
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = link.cancelled() => {
                let _ = tokio::time::timeout(config.write_timeout(), sink.send(Message::Close(None))).await;
                debug!(link = link.id(), "Sender stopped");
                return Ok(());
            }

            item = outbound_rx.recv() => match item {
                Some(Outbound::Text { request_id, method, payload }) => {
                    write_frame(&mut sink, Message::Text(payload), config.write_timeout()).await?;
                    link.heartbeat().record_transmit(Instant::now());
                    debug!(link = link.id(), request_id = %request_id, method = %method, "Request sent");
                }
                Some(Outbound::Keepalive) => {
                    write_frame(&mut sink, Message::Ping(Vec::new()), config.ping_timeout()).await?;
                    link.heartbeat().record_ping(Instant::now());
                    trace!(link = link.id(), "Keepalive ping sent");
                }
                None => return Ok(()),
            },

            _ = tick.tick() => {
                if link.heartbeat().try_schedule_keepalive(Instant::now(), config.keepalive_interval()) {
                    schedule_keepalive(&link);
                }
            }
        }
    }
}

/// Enqueue the keepalive without blocking the sender on its own queue.
fn schedule_keepalive(link: &Arc<Link>) {
    let tx = link.outbound().clone();
    let link = Arc::clone(link);
    tokio::spawn(async move {
        if tx.send(Outbound::Keepalive).await.is_err() {
            link.heartbeat().cancel_keepalive();
        }
    });
}

async fn write_frame(sink: &mut WsSink, message: Message, deadline: Duration) -> WsResult<()> {
    match tokio::time::timeout(deadline, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WsError::Write(e.to_string())),
        Err(_) => Err(WsError::Write(format!(
            "write timed out after {}ms",
            deadline.as_millis()
        ))),
    }
}
