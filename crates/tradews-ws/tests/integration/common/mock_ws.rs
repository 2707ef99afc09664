//! Mock trading WebSocket server for integration tests.
//!
//! Provides a WebSocket server that can:
//! - Accept connections and count them
//! - Reply to requests through a scriptable responder (optionally delayed)
//! - Record received text messages and ping frames
//! - Push arbitrary frames and drop connections on demand

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub delay: Duration,
    pub text: String,
}

impl Reply {
    pub fn now(value: Value) -> Self {
        Self {
            delay: Duration::ZERO,
            text: value.to_string(),
        }
    }

    pub fn after(delay: Duration, value: Value) -> Self {
        Self {
            delay,
            text: value.to_string(),
        }
    }
}

/// Maps a received request to the replies sent back.
pub type Responder = Arc<dyn Fn(&Value) -> Vec<Reply> + Send + Sync>;

enum Command {
    Send(String),
    Drop,
}

struct MockState {
    messages: Mutex<Vec<String>>,
    connections: AtomicU32,
    pings: AtomicU32,
    peers: Mutex<Vec<mpsc::UnboundedSender<Command>>>,
    responder: Responder,
}

/// A mock trading WebSocket server.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    state: Arc<MockState>,
}

pub fn login_result(id: &Value) -> Value {
    let now = chrono::Utc::now().timestamp_millis();
    json!({
        "id": id,
        "status": 200,
        "result": {
            "apiKey": "test-key",
            "authorizedSince": now,
            "connectedSince": now,
            "returnRateLimits": false,
            "serverTime": now
        }
    })
}

/// Session report after `session.logout`.
pub fn logged_out_result(id: &Value) -> Value {
    let now = chrono::Utc::now().timestamp_millis();
    json!({
        "id": id,
        "status": 200,
        "result": {
            "apiKey": null,
            "authorizedSince": null,
            "connectedSince": now,
            "returnRateLimits": false,
            "serverTime": now
        }
    })
}

pub fn order_result(id: &Value, status: &str, params: &Value) -> Value {
    json!({
        "id": id,
        "status": 200,
        "result": {
            "orderId": 1001,
            "symbol": params.get("symbol").cloned().unwrap_or(Value::Null),
            "status": status,
            "clientOrderId": params.get("newClientOrderId").cloned().unwrap_or(json!("")),
            "price": params.get("price").cloned().unwrap_or(json!("0")),
            "origQty": params.get("quantity").cloned().unwrap_or(json!("0")),
            "executedQty": "0",
            "side": params.get("side").cloned().unwrap_or(json!("")),
            "type": params.get("type").cloned().unwrap_or(json!("")),
            "updateTime": 1_700_000_000_000_i64
        },
        "rateLimits": [{
            "rateLimitType": "ORDERS",
            "interval": "SECOND",
            "intervalNum": 10,
            "limit": 50,
            "count": 1
        }]
    })
}

/// Behaves like the exchange for logon, place, cancel and cancel-all.
pub fn exchange_responder() -> Responder {
    Arc::new(|request: &Value| {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        match request.get("method").and_then(Value::as_str) {
            Some("session.logon") => vec![Reply::now(login_result(&id))],
            Some("session.logout") => vec![Reply::now(logged_out_result(&id))],
            Some("order.place") => vec![Reply::now(order_result(&id, "NEW", &params))],
            Some("order.cancel") => vec![Reply::now(order_result(&id, "CANCELED", &params))],
            Some("openOrders.cancelAll") => vec![Reply::now(json!({
                "id": id,
                "status": 200,
                "result": [
                    {"orderId": 1, "symbol": params["symbol"], "status": "CANCELED"},
                    {"orderId": 2, "symbol": params["symbol"], "status": "CANCELED"}
                ]
            }))],
            _ => Vec::new(),
        }
    })
}

/// Start a server that completes the handshake and then drops the socket.
///
/// Returns its URL and the number of accepted handshakes.
pub async fn start_hangup_server() -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));

    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = accept_async(stream).await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(ws);
            }
        }
    });

    (format!("ws://{addr}"), accepted)
}

impl MockWsServer {
    /// Start a server that behaves like the exchange.
    pub async fn start() -> Self {
        Self::with_responder(exchange_responder()).await
    }

    /// Start a server with custom replies.
    pub async fn with_responder(responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let state = Arc::new(MockState {
            messages: Mutex::new(Vec::new()),
            connections: AtomicU32::new(0),
            pings: AtomicU32::new(0),
            peers: Mutex::new(Vec::new()),
            responder,
        });

        let state_clone = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, state_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            state,
        }
    }

    /// Get the server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn connection_count(&self) -> u32 {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn ping_count(&self) -> u32 {
        self.state.pings.load(Ordering::SeqCst)
    }

    /// All received text messages, in arrival order.
    pub async fn received_messages(&self) -> Vec<Value> {
        self.state
            .messages
            .lock()
            .await
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Received messages with the given method.
    pub async fn received_with_method(&self, method: &str) -> Vec<Value> {
        self.received_messages()
            .await
            .into_iter()
            .filter(|m| m["method"] == method)
            .collect()
    }

    /// Send a raw text frame on every open connection.
    pub async fn push(&self, text: impl Into<String>) {
        let text = text.into();
        for peer in self.state.peers.lock().await.iter() {
            let _ = peer.send(Command::Send(text.clone()));
        }
    }

    /// Abruptly close every open connection (no close frame).
    pub async fn drop_connections(&self) {
        for peer in self.state.peers.lock().await.drain(..) {
            let _ = peer.send(Command::Drop);
        }
    }

    /// Poll until `predicate` holds or `limit` elapses.
    pub async fn wait_until<F>(&self, limit: Duration, mut predicate: F) -> bool
    where
        F: FnMut(&Self) -> bool,
    {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if predicate(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        predicate(self)
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        self.drop_connections().await;
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<MockState>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    state.connections.fetch_add(1, Ordering::SeqCst);

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    state.peers.lock().await.push(cmd_tx.clone());

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    state.messages.lock().await.push(text.clone());
                    let Ok(request) = serde_json::from_str::<Value>(&text) else {
                        continue;
                    };
                    for reply in (state.responder)(&request) {
                        if reply.delay.is_zero() {
                            let _ = write.send(Message::Text(reply.text)).await;
                        } else {
                            let tx = cmd_tx.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(reply.delay).await;
                                let _ = tx.send(Command::Send(reply.text));
                            });
                        }
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    state.pings.fetch_add(1, Ordering::SeqCst);
                    let _ = write.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(text)) => {
                    let _ = write.send(Message::Text(text)).await;
                }
                Some(Command::Drop) | None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockWsServer::start().await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
