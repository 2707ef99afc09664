//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info,tradews=debug";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Pick from `RUST_ENV`: JSON in production, pretty otherwise.
    #[default]
    Auto,
    Pretty,
    Json,
}

impl LogFormat {
    /// Collapse `Auto` using the value of `RUST_ENV`.
    pub fn resolve(self, rust_env: Option<&str>) -> Self {
        match self {
            Self::Auto if rust_env == Some("production") => Self::Json,
            Self::Auto => Self::Pretty,
            other => other,
        }
    }
}

/// Logging section of the application config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directives; `RUST_LOG` takes precedence when set.
    pub filter: Option<String>,
    pub format: LogFormat,
}

/// Initialize logging with defaults.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(&LoggingConfig::default())
}

/// Initialize logging from `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), config)?;
    let rust_env = std::env::var("RUST_ENV").ok();

    let result = match config.format.resolve(rust_env.as_deref()) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// `RUST_LOG`, then the configured filter, then [`DEFAULT_FILTER`].
fn build_filter(rust_log: Option<&str>, config: &LoggingConfig) -> TelemetryResult<EnvFilter> {
    let directives = rust_log
        .filter(|s| !s.trim().is_empty())
        .or(config.filter.as_deref())
        .unwrap_or(DEFAULT_FILTER);

    EnvFilter::try_new(directives).map_err(|e| TelemetryError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution() {
        assert_eq!(LogFormat::Auto.resolve(Some("production")), LogFormat::Json);
        assert_eq!(LogFormat::Auto.resolve(Some("dev")), LogFormat::Pretty);
        assert_eq!(LogFormat::Auto.resolve(None), LogFormat::Pretty);
        assert_eq!(LogFormat::Pretty.resolve(Some("production")), LogFormat::Pretty);
    }

    #[test]
    fn test_filter_precedence() {
        let config = LoggingConfig {
            filter: Some("warn".to_string()),
            format: LogFormat::Auto,
        };
        assert_eq!(build_filter(Some("debug"), &config).unwrap().to_string(), "debug");
        assert_eq!(build_filter(None, &config).unwrap().to_string(), "warn");
        assert_eq!(build_filter(Some("  "), &config).unwrap().to_string(), "warn");
        assert!(build_filter(None, &LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let config = LoggingConfig {
            filter: Some("tradews=loud".to_string()),
            format: LogFormat::Auto,
        };
        assert!(matches!(
            build_filter(None, &config),
            Err(TelemetryError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_config_deserialize() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, None);
    }

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig {
            filter: Some("off".to_string()),
            format: LogFormat::Pretty,
        };
        let first = init_logging_with(&config);
        let second = init_logging_with(&config);
        // Another test binary may already own the global subscriber.
        assert!(first.is_err() || second.is_err());
        assert!(matches!(second, Err(TelemetryError::LoggingInit(_))));
    }
}
