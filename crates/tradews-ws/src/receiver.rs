//! Inbound reader.
//!
//! Reads frames in arrival order, records liveness and hands each text
//! payload to the dispatch pool without waiting on it. If the pool is
//! saturated the frame is dropped so the socket keeps draining.

use crate::connection::Link;
use crate::dispatch::InboundFrame;
use crate::error::{WsError, WsResult};
use crate::message::EnvelopeShape;
use crate::transport::WsStream;
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

/// Text payload some servers use as an application-level pong.
const TEXT_PONG: &str = "pong";

/// Code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

pub(crate) type WsSource = SplitStream<WsStream>;

/// Run until the link is cancelled or the read side fails or closes.
pub(crate) async fn run_receiver(
    link: Arc<Link>,
    mut source: WsSource,
    dispatch_tx: mpsc::Sender<InboundFrame>,
) -> WsResult<()> {
    loop {
        let frame = tokio::select! {
            biased;
            _ = link.cancelled() => {
                debug!(link = link.id(), "Receiver stopped");
                return Ok(());
            }
            frame = source.next() => frame,
        };

        let now = Instant::now();
        match frame {
            Some(Ok(Message::Text(text))) => {
                if text == TEXT_PONG {
                    link.heartbeat().record_pong(now);
                    continue;
                }

                let shape = EnvelopeShape::detect(&text);
                trace!(link = link.id(), ?shape, len = text.len(), "Frame received");
                let frame = InboundFrame {
                    shape,
                    text,
                    received_at: now,
                };
                match dispatch_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(frame)) => {
                        warn!(
                            link = link.id(),
                            len = frame.text.len(),
                            "Dispatch queue full, inbound message dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => return Ok(()),
                }
            }
            Some(Ok(Message::Pong(_))) => {
                link.heartbeat().record_pong(now);
            }
            // Pongs to server pings are queued by tungstenite itself.
            Some(Ok(Message::Ping(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.into_owned()))
                    .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                return Err(WsError::ConnectionClosed { code, reason });
            }
            Some(Ok(Message::Binary(data))) => {
                debug!(link = link.id(), len = data.len(), "Ignoring binary frame");
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => return Err(WsError::Read(e.to_string())),
            None => {
                return Err(WsError::ConnectionClosed {
                    code: ABNORMAL_CLOSURE,
                    reason: "stream ended".to_string(),
                })
            }
        }
    }
}
