//! `mail-tracker` binary configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the tracker
//! is built. The library itself only takes an in-memory [`TrackerConfig`].
//!
//! ## Variables
//!
//! - `TRACKER_PORT` - Listening port (default: `8080`)
//! - `TRACKER_DOMAIN` - Public `host[:port]` used in links (default: `localhost:8080`)
//! - `TRACKER_PATH` - Pixel path prefix (default: `/pixel`)
//! - `TRACKER_SCHEME` - `http` or `https` for links (default: `http`)
//! - `LISTEN_HOST` - Bind host (default: `0.0.0.0`)
//! - `TOKEN_SECRET` - Enables signed tokens when set
//! - `BEHIND_PROXY` - Read the client address from `X-Forwarded-For` (default: `false`)
//! - `DISPATCH_QUEUE_CAPACITY` - Pending open events (default: 10000)
//! - `CALLBACK_CONCURRENCY` - Dispatch lanes, i.e. parallel callbacks (default: 4)
//! - `CALLBACK_TIMEOUT_MS` - Slow callback threshold (default: 5000)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::tracker::{DispatchConfig, Scheme, TrackerConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub domain: String,
    pub path: String,
    pub scheme: Scheme,
    pub listen_host: String,
    /// HMAC key for signed tokens (`TOKEN_SECRET`). Never logged.
    pub token_secret: Option<String>,
    /// Enable only behind a trusted reverse proxy.
    pub behind_proxy: bool,
    pub dispatch_queue_capacity: usize,
    pub callback_concurrency: usize,
    pub callback_timeout_ms: u64,
    pub log_level: String,
    pub log_format: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable or `TRACKER_SCHEME` is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let port = parse_var("TRACKER_PORT", 8080)?;
        let domain = env::var("TRACKER_DOMAIN").unwrap_or_else(|_| "localhost:8080".to_string());
        let path = env::var("TRACKER_PATH").unwrap_or_else(|_| "/pixel".to_string());
        let scheme = parse_var("TRACKER_SCHEME", Scheme::Http)?;
        let listen_host = env::var("LISTEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let token_secret = env::var("TOKEN_SECRET").ok();

        let behind_proxy = env::var("BEHIND_PROXY")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let dispatch_queue_capacity = parse_var("DISPATCH_QUEUE_CAPACITY", 10_000)?;
        let callback_concurrency = parse_var("CALLBACK_CONCURRENCY", 4)?;
        let callback_timeout_ms = parse_var("CALLBACK_TIMEOUT_MS", 5_000)?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(Self {
            port,
            domain,
            path,
            scheme,
            listen_host,
            token_secret,
            behind_proxy,
            dispatch_queue_capacity,
            callback_concurrency,
            callback_timeout_ms,
            log_level,
            log_format,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `log_format` is not `text` or `json`, or if the
    /// resulting [`TrackerConfig`] is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        self.tracker_config()
            .validate()
            .context("Invalid tracker configuration")?;

        Ok(())
    }

    /// Builds the library configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        let mut config = TrackerConfig::new(self.port, &self.domain, &self.path)
            .with_scheme(self.scheme)
            .with_listen_host(&self.listen_host)
            .with_behind_proxy(self.behind_proxy)
            .with_dispatch(DispatchConfig {
                queue_capacity: self.dispatch_queue_capacity,
                concurrency: self.callback_concurrency,
                callback_timeout: Duration::from_millis(self.callback_timeout_ms),
            });

        if let Some(secret) = &self.token_secret {
            config = config.with_token_secret(secret);
        }

        config
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}:{}", self.listen_host, self.port);
        tracing::info!(
            "  Links: {}://{}{}/{{token}}",
            self.scheme,
            self.domain,
            self.path
        );
        tracing::info!(
            "  Token signing: {}",
            mask_secret(self.token_secret.as_deref())
        );
        tracing::info!("  Behind proxy: {}", self.behind_proxy);
        tracing::info!("  Dispatch queue capacity: {}", self.dispatch_queue_capacity);
        tracing::info!(
            "  Callbacks: {} concurrent, {}ms timeout",
            self.callback_concurrency,
            self.callback_timeout_ms
        );
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {name}: '{value}'")),
        Err(_) => Ok(default),
    }
}

fn mask_secret(secret: Option<&str>) -> &'static str {
    match secret {
        Some(_) => "enabled (***)",
        None => "disabled",
    }
}

/// Loads and validates configuration from environment variables.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
