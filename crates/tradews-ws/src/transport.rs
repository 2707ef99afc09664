//! Dialing: TCP (direct, pinned egress or proxied), TLS and the WebSocket
//! upgrade, all under one handshake deadline.

use crate::config::ClientConfig;
use crate::error::{WsError, WsResult};
use crate::proxy::{ProxyMode, ProxySettings};
use crate::resolver::Resolve;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpSocket, TcpStream};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Error as TungsteniteError;
use tokio_tungstenite::{client_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Host, port and scheme of the dial target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Target {
    pub fn parse(url: &str) -> WsResult<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| WsError::InvalidUrl(format!("{url}: {e}")))?;
        let secure = match uri.scheme_str() {
            Some("wss") => true,
            Some("ws") => false,
            _ => return Err(WsError::InvalidUrl(format!("{url}: expected ws:// or wss://"))),
        };
        let host = uri
            .host()
            .ok_or_else(|| WsError::InvalidUrl(format!("{url}: missing host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        Ok(Self { host, port, secure })
    }
}

/// Opens WebSocket connections according to a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct Dialer {
    config: Arc<ClientConfig>,
    resolver: Arc<dyn Resolve>,
}

impl Dialer {
    pub fn new(config: Arc<ClientConfig>, resolver: Arc<dyn Resolve>) -> Self {
        crate::init_crypto();
        Self { config, resolver }
    }

    fn ws_config(&self) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.config.max_message_size);
        ws_config.max_frame_size = Some(self.config.max_message_size);
        ws_config
    }

    /// Dial once. Fails with `HandshakeTimeout` if the whole handshake takes
    /// longer than the configured deadline.
    pub async fn dial(&self) -> WsResult<WsStream> {
        let deadline = self.config.handshake_timeout();
        match tokio::time::timeout(deadline, self.dial_inner()).await {
            Ok(result) => result,
            Err(_) => Err(WsError::HandshakeTimeout(deadline)),
        }
    }

    async fn dial_inner(&self) -> WsResult<WsStream> {
        let url = self.config.url.as_str();
        let target = Target::parse(url)?;
        let tcp = self.open_tcp(&target).await?;
        tcp.set_nodelay(true)?;

        let (stream, response) =
            client_async_tls_with_config(url, tcp, Some(self.ws_config()), None)
                .await
                .map_err(map_handshake_error)?;

        let status = response.status();
        if status.as_u16() != 101 {
            // The upgrade succeeded, so this is informational only.
            warn!(status = %status, "Unexpected handshake status");
        }
        info!(url, "WebSocket connected");
        Ok(stream)
    }

    async fn open_tcp(&self, target: &Target) -> WsResult<TcpStream> {
        if let Some(local_ip) = self.config.local_ip {
            let addrs = self.resolve(target).await?;
            return connect_from(local_ip, &addrs).await;
        }

        if self.config.proxy == ProxyMode::Env {
            if let Some(proxy) = ProxySettings::from_env(&target.host, target.secure) {
                debug!(proxy = ?proxy, "Dialing through proxy");
                return proxy.connect(&target.host, target.port).await;
            }
        }

        let addrs = self.resolve(target).await?;
        TcpStream::connect(addrs.as_slice())
            .await
            .map_err(|e| WsError::DialFailed {
                status: None,
                reason: format!("connect to {}:{}: {e}", target.host, target.port),
            })
    }

    async fn resolve(&self, target: &Target) -> WsResult<Vec<SocketAddr>> {
        self.resolver
            .resolve(&target.host, target.port)
            .await
            .map_err(|e| WsError::Resolve {
                host: target.host.clone(),
                reason: e.to_string(),
            })
    }
}

/// Connect to the first reachable address from a fixed source address.
async fn connect_from(local_ip: std::net::IpAddr, addrs: &[SocketAddr]) -> WsResult<TcpStream> {
    let mut last_error = None;
    for addr in addrs.iter().filter(|a| a.is_ipv4() == local_ip.is_ipv4()) {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.bind(SocketAddr::new(local_ip, 0))?;
        match socket.connect(*addr).await {
            Ok(stream) => {
                debug!(local = %local_ip, remote = %addr, "Connected from pinned address");
                return Ok(stream);
            }
            Err(e) => last_error = Some(format!("{addr}: {e}")),
        }
    }
    Err(WsError::DialFailed {
        status: None,
        reason: last_error
            .unwrap_or_else(|| format!("no address matching the family of {local_ip}")),
    })
}

fn map_handshake_error(error: TungsteniteError) -> WsError {
    match error {
        TungsteniteError::Http(response) => WsError::DialFailed {
            status: Some(response.status().as_u16()),
            reason: "handshake rejected".to_string(),
        },
        other => WsError::DialFailed {
            status: None,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SystemResolver;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_target() {
        let spot = Target::parse("wss://ws-api.binance.com:443/ws-api/v3").unwrap();
        assert_eq!(spot.host, "ws-api.binance.com");
        assert_eq!(spot.port, 443);
        assert!(spot.secure);

        let futures = Target::parse("wss://ws-fapi.binance.com/ws-fapi/v1").unwrap();
        assert_eq!(futures.port, 443);

        let local = Target::parse("ws://127.0.0.1:9000").unwrap();
        assert_eq!(local.port, 9000);
        assert!(!local.secure);

        assert!(matches!(
            Target::parse("https://example.com"),
            Err(WsError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_from_pinned_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().1 });

        let local_ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let stream = connect_from(local_ip, &[addr]).await.unwrap();
        assert_eq!(stream.local_addr().unwrap().ip(), local_ip);

        let peer = accept.await.unwrap();
        assert_eq!(peer.ip(), local_ip);
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        // Accepts TCP but never answers the upgrade.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let config = ClientConfig {
            url: format!("ws://{addr}"),
            handshake_timeout_ms: 200,
            proxy: ProxyMode::Disabled,
            ..ClientConfig::default()
        };
        let dialer = Dialer::new(Arc::new(config), Arc::new(SystemResolver));
        let err = dialer.dial().await.unwrap_err();
        assert!(matches!(err, WsError::HandshakeTimeout(_)));
    }

    #[tokio::test]
    async fn test_dial_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig {
            url: format!("ws://{addr}"),
            proxy: ProxyMode::Disabled,
            ..ClientConfig::default()
        };
        let dialer = Dialer::new(Arc::new(config), Arc::new(SystemResolver));
        assert!(matches!(
            dialer.dial().await,
            Err(WsError::DialFailed { status: None, .. })
        ));
    }
}
