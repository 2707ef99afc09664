//! Client configuration.

use crate::proxy::ProxyMode;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use tradews_core::Endpoint;

/// Tuning knobs for a [`TradingClient`](crate::TradingClient).
///
/// Every field has a default, so a config file only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL.
    pub url: String,
    /// Local source address for outbound connections. Disables the
    /// environment proxy when set.
    pub local_ip: Option<IpAddr>,
    /// How to reach the server when no local address is pinned.
    pub proxy: ProxyMode,
    /// Wait between failed dial attempts.
    pub redial_interval_ms: u64,
    /// Upper bound for TCP connect, TLS and the WebSocket upgrade.
    pub handshake_timeout_ms: u64,
    /// Deadline for writing one text frame.
    pub write_timeout_ms: u64,
    /// Deadline for writing one ping frame.
    pub ping_timeout_ms: u64,
    /// Idle time after the last transmission before a ping is sent.
    pub keepalive_interval_ms: u64,
    /// Period of the sender's keepalive check.
    pub sender_tick_ms: u64,
    /// Minimum time between two logon requests on one connection.
    pub login_throttle_ms: u64,
    /// Logon confirmations older than this are treated as stale.
    pub login_confirmation_window_ms: u64,
    /// How often `wait_for_authorization` re-checks the session.
    pub auth_poll_interval_ms: u64,
    /// How long `wait_for_authorization` waits before failing.
    pub auth_timeout_ms: u64,
    /// Largest inbound message or frame accepted.
    pub max_message_size: usize,
    /// Outbound queue depth. Enqueuing blocks while it is full.
    pub outbound_queue_capacity: usize,
    /// Workers routing inbound messages. Use 1 for strict arrival order.
    pub dispatch_workers: usize,
    /// Inbound messages buffered ahead of the workers. Extra messages are
    /// dropped with a warning.
    pub dispatch_queue_capacity: usize,
    /// How long a worker waits on a full consumer channel.
    pub publish_timeout_ms: u64,
    /// `recvWindow` sent with the logon, if any.
    pub recv_window_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: Endpoint::default().url().to_string(),
            local_ip: None,
            proxy: ProxyMode::default(),
            redial_interval_ms: 2_000,
            handshake_timeout_ms: 45_000,
            write_timeout_ms: 3_000,
            ping_timeout_ms: 10_000,
            keepalive_interval_ms: 15_000,
            sender_tick_ms: 300,
            login_throttle_ms: 30_000,
            login_confirmation_window_ms: 30_000,
            auth_poll_interval_ms: 300,
            auth_timeout_ms: 30_000,
            max_message_size: 655_350,
            outbound_queue_capacity: 3,
            dispatch_workers: 4,
            dispatch_queue_capacity: 256,
            publish_timeout_ms: 5_000,
            recv_window_ms: Some(5_000),
        }
    }
}

impl ClientConfig {
    /// Defaults pointed at `endpoint`.
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        Self {
            url: endpoint.url().to_string(),
            ..Self::default()
        }
    }

    pub fn redial_interval(&self) -> Duration {
        Duration::from_millis(self.redial_interval_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn sender_tick(&self) -> Duration {
        Duration::from_millis(self.sender_tick_ms.max(1))
    }

    pub fn login_throttle(&self) -> Duration {
        Duration::from_millis(self.login_throttle_ms)
    }

    pub fn login_confirmation_window(&self) -> Duration {
        Duration::from_millis(self.login_confirmation_window_ms)
    }

    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_millis(self.auth_poll_interval_ms.max(1))
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.url, Endpoint::SPOT_URL);
        assert_eq!(config.redial_interval(), Duration::from_secs(2));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(45));
        assert_eq!(config.write_timeout(), Duration::from_secs(3));
        assert_eq!(config.ping_timeout(), Duration::from_secs(10));
        assert_eq!(config.keepalive_interval(), Duration::from_secs(15));
        assert_eq!(config.sender_tick(), Duration::from_millis(300));
        assert_eq!(config.login_throttle(), Duration::from_secs(30));
        assert_eq!(config.max_message_size, 655_350);
        assert_eq!(config.outbound_queue_capacity, 3);
        assert_eq!(config.recv_window_ms, Some(5_000));
        assert_eq!(config.proxy, ProxyMode::Env);
    }

    #[test]
    fn test_partial_override() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url":"ws://127.0.0.1:9000","dispatch_workers":1}"#).unwrap();
        assert_eq!(config.url, "ws://127.0.0.1:9000");
        assert_eq!(config.dispatch_workers, 1);
        assert_eq!(config.redial_interval_ms, 2_000);
    }

    #[test]
    fn test_for_endpoint() {
        let config = ClientConfig::for_endpoint(&Endpoint::FuturesTestnet);
        assert_eq!(config.url, Endpoint::FUTURES_TESTNET_URL);
    }
}
