//! Application configuration.
//!
//! Loaded from a TOML file, then overridden by `TRADEWS__`-prefixed
//! environment variables (`TRADEWS__API_KEY`, `TRADEWS__CLIENT__REDIAL_INTERVAL_MS`).

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use tradews_auth::KeySource;
use tradews_core::Endpoint;
use tradews_telemetry::LoggingConfig;
use tradews_ws::{ClientConfig, ProxyMode, Target};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRADEWS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "TRADEWS";
const ENV_SEPARATOR: &str = "__";

fn default_endpoint() -> String {
    "spot".to_string()
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalogue name (`spot`, `futures_testnet`, ...) or a `ws(s)://` URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    /// Where to read the Ed25519 PKCS#8 PEM key from.
    pub private_key: KeySource,
    /// Local address to dial from.
    #[serde(default)]
    pub local_ip: Option<IpAddr>,
    /// Fixed addresses for the endpoint host, bypassing DNS.
    #[serde(default)]
    pub service_ips: Vec<IpAddr>,
    #[serde(default)]
    pub proxy: ProxyMode,
    /// Client tuning; `url`, `local_ip` and `proxy` are taken from above.
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Resolve the config path: explicit > `TRADEWS_CONFIG` > default.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from a file plus process environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        Self::from_sources(path, environment())
    }

    /// Load from a file plus the given environment source.
    pub fn from_sources(path: &str, env: config::Environment) -> AppResult<Self> {
        if !Path::new(path).exists() {
            return Err(AppError::Config(format!("config file not found: {path}")));
        }

        let config: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(true))
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::Config("api_key must not be empty".to_string()));
        }
        let endpoint = self.endpoint()?;
        Target::parse(endpoint.url()).map_err(|e| AppError::Config(e.to_string()))?;
        Ok(())
    }

    pub fn endpoint(&self) -> AppResult<Endpoint> {
        self.endpoint
            .parse()
            .map_err(|e: tradews_core::CoreError| AppError::Config(e.to_string()))
    }

    /// The effective client configuration.
    pub fn client_config(&self) -> AppResult<ClientConfig> {
        Ok(ClientConfig {
            url: self.endpoint()?.url().to_string(),
            local_ip: self.local_ip,
            proxy: self.proxy,
            ..self.client.clone()
        })
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
