//! Trading WebSocket API endpoints.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known trading WebSocket API endpoints, or an explicit URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Spot trading API.
    #[default]
    Spot,
    /// Spot trading API on the testnet.
    SpotTestnet,
    /// USD-M futures trading API.
    Futures,
    /// USD-M futures trading API on the testnet.
    FuturesTestnet,
    /// Any other `ws://` or `wss://` URL (e.g. a local test server).
    Custom(String),
}

impl Endpoint {
    pub const SPOT_URL: &'static str = "wss://ws-api.binance.com:443/ws-api/v3";
    pub const SPOT_TESTNET_URL: &'static str = "wss://ws-api.testnet.binance.vision/ws-api/v3";
    pub const FUTURES_URL: &'static str = "wss://ws-fapi.binance.com/ws-fapi/v1";
    pub const FUTURES_TESTNET_URL: &'static str = "wss://testnet.binancefuture.com/ws-fapi/v1";

    /// The WebSocket URL to dial.
    pub fn url(&self) -> &str {
        match self {
            Self::Spot => Self::SPOT_URL,
            Self::SpotTestnet => Self::SPOT_TESTNET_URL,
            Self::Futures => Self::FUTURES_URL,
            Self::FuturesTestnet => Self::FUTURES_TESTNET_URL,
            Self::Custom(url) => url,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

impl FromStr for Endpoint {
    type Err = CoreError;

    /// Accepts a catalogue name (`spot`, `spot_testnet`, `futures`,
    /// `futures_testnet`) or a `ws://`/`wss://` URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spot" => Ok(Self::Spot),
            "spot_testnet" => Ok(Self::SpotTestnet),
            "futures" => Ok(Self::Futures),
            "futures_testnet" => Ok(Self::FuturesTestnet),
            _ if s.starts_with("ws://") || s.starts_with("wss://") => {
                Ok(Self::Custom(s.trim().to_string()))
            }
            _ => Err(CoreError::UnknownEndpoint(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_names() {
        assert_eq!("spot".parse::<Endpoint>().unwrap().url(), Endpoint::SPOT_URL);
        assert_eq!(
            "FUTURES_TESTNET".parse::<Endpoint>().unwrap(),
            Endpoint::FuturesTestnet
        );
    }

    #[test]
    fn test_custom_url() {
        let endpoint: Endpoint = "ws://127.0.0.1:9000".parse().unwrap();
        assert_eq!(endpoint.url(), "ws://127.0.0.1:9000");
        assert!("http://example.com".parse::<Endpoint>().is_err());
    }
}
