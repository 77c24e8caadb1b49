//! Environment-based configuration for the labpulse API.

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use labpulse_webhooks::dispatcher::DispatcherConfig;
use labpulse_webhooks::EngineConfig;

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Permit plain HTTP webhook targets (dev/test only).
    pub webhook_allow_http: bool,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from environment variables, applying defaults
    /// where values are absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8002".to_string())
            .parse::<u16>()?;

        let dispatcher = DispatcherConfig {
            poll_interval: Duration::from_millis(parse_var("WEBHOOK_DISPATCH_INTERVAL_MS", 200)?),
            batch_size: parse_var("WEBHOOK_BATCH_SIZE", 100)?,
            max_attempts: parse_var("WEBHOOK_MAX_ATTEMPTS", 5)?,
            backoff_cap_secs: parse_var("WEBHOOK_BACKOFF_CAP_SECS", 60)?,
            max_in_flight: parse_var("WEBHOOK_MAX_IN_FLIGHT", 16)?,
            per_target_serial: parse_bool("WEBHOOK_PER_TARGET_SERIAL", true)?,
        };

        let engine = EngineConfig {
            dispatcher,
            request_timeout: Duration::from_secs(parse_var("WEBHOOK_REQUEST_TIMEOUT_SECS", 3)?),
            stuck_after: Duration::from_secs(parse_var("WEBHOOK_STUCK_AFTER_SECS", 300)?),
            reclaim_interval: Duration::from_secs(parse_var("WEBHOOK_RECLAIM_INTERVAL_SECS", 120)?),
            retention: Duration::from_secs(
                parse_var("WEBHOOK_RETENTION_DAYS", 7)? * 24 * 3600,
            ),
            purge_interval: Duration::from_secs(parse_var("WEBHOOK_PURGE_INTERVAL_SECS", 3600)?),
        };

        Ok(Self {
            database_url,
            host,
            port,
            webhook_allow_http: parse_bool("WEBHOOK_ALLOW_HTTP", false)?,
            engine,
        })
    }

    /// Socket address string for the HTTP listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse an optional numeric env var with a default.
fn parse_var<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse an optional boolean env var ("true"/"false") with a default.
fn parse_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                message: format!("expected true or false, got {other}"),
            }),
        },
        Err(_) => Ok(default),
    }
}
