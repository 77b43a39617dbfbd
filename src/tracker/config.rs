//! In-memory tracker configuration.
//!
//! Built by the embedding application (or by [`crate::config::Config`] from
//! the environment) and validated by [`crate::Tracker::new`]. Immutable once
//! the tracker exists.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::TrackerError;

/// Scheme used in generated links. TLS itself is terminated elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(TrackerError::config(format!(
                "scheme must be 'http' or 'https', got '{other}'"
            ))),
        }
    }
}

/// Settings for handing open events to the callback.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Events waiting for a callback slot; further events are dropped and reported.
    pub queue_capacity: usize,
    /// Callbacks allowed to run at the same time.
    pub concurrency: usize,
    /// Callbacks running longer than this are reported as slow.
    pub callback_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            concurrency: 4,
            callback_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Listening port; unused when the router is mounted on an external listener.
    pub port: u16,
    /// Public `host[:port]` placed in links, without scheme.
    pub domain: String,
    /// Path prefix of pixel links, e.g. `/pixel`.
    pub path: String,
    pub scheme: Scheme,
    pub listen_host: String,
    /// Enables signed tokens when set.
    pub token_secret: Option<String>,
    /// Take the remote address from `X-Forwarded-For` / `X-Real-IP`.
    pub behind_proxy: bool,
    pub dispatch: DispatchConfig,
}

impl TrackerConfig {
    pub fn new(port: u16, domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            port,
            domain: domain.into(),
            path: path.into(),
            scheme: Scheme::Http,
            listen_host: "0.0.0.0".to_string(),
            token_secret: None,
            behind_proxy: false,
            dispatch: DispatchConfig::default(),
        }
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = host.into();
        self
    }

    pub fn with_token_secret(mut self, secret: impl Into<String>) -> Self {
        self.token_secret = Some(secret.into());
        self
    }

    pub fn with_behind_proxy(mut self, behind_proxy: bool) -> Self {
        self.behind_proxy = behind_proxy;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if:
    /// - `port` is 0
    /// - `domain` is empty, carries a scheme, path, query or credentials,
    ///   or is not a valid `host[:port]`
    /// - `path` is not a non-root absolute path made of plain segments
    /// - dispatch limits are out of range
    /// - `token_secret` is set but empty
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.port == 0 {
            return Err(TrackerError::config("port must be between 1 and 65535"));
        }

        validate_domain(&self.domain)?;
        validate_path(&self.path)?;

        if self.listen_host.trim().is_empty() {
            return Err(TrackerError::config("listen host must not be empty"));
        }

        if self.dispatch.queue_capacity == 0 || self.dispatch.queue_capacity > 1_000_000 {
            return Err(TrackerError::config(format!(
                "dispatch queue capacity must be between 1 and 1000000, got {}",
                self.dispatch.queue_capacity
            )));
        }

        if self.dispatch.concurrency == 0 || self.dispatch.concurrency > 256 {
            return Err(TrackerError::config(format!(
                "callback concurrency must be between 1 and 256, got {}",
                self.dispatch.concurrency
            )));
        }

        if self.dispatch.callback_timeout.is_zero() {
            return Err(TrackerError::config(
                "callback timeout must be greater than 0",
            ));
        }

        if self.token_secret.as_deref() == Some("") {
            return Err(TrackerError::config("token secret must not be empty"));
        }

        Ok(())
    }

    /// `listen_host:port`.
    pub fn listen_addr(&self) -> String {
        if self.listen_host.contains(':') && !self.listen_host.starts_with('[') {
            format!("[{}]:{}", self.listen_host, self.port)
        } else {
            format!("{}:{}", self.listen_host, self.port)
        }
    }
}

fn validate_domain(domain: &str) -> Result<(), TrackerError> {
    if domain.is_empty() {
        return Err(TrackerError::config("domain must not be empty"));
    }

    if domain.contains("://") {
        return Err(TrackerError::config(format!(
            "domain must not include a scheme, got '{domain}'"
        )));
    }

    if domain
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '\\'))
    {
        return Err(TrackerError::config(format!(
            "domain must be host[:port], got '{domain}'"
        )));
    }

    let parsed = Url::parse(&format!("http://{domain}/"))
        .map_err(|e| TrackerError::config(format!("invalid domain '{domain}': {e}")))?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(TrackerError::config(format!(
            "domain must contain a host, got '{domain}'"
        )));
    }

    Ok(())
}

fn validate_path(path: &str) -> Result<(), TrackerError> {
    if path.is_empty() {
        return Err(TrackerError::config("path must not be empty"));
    }

    if !path.starts_with('/') {
        return Err(TrackerError::config(format!(
            "path must start with '/', got '{path}'"
        )));
    }

    if path == "/" || path.ends_with('/') {
        return Err(TrackerError::config(format!(
            "path must name a prefix without a trailing '/', got '{path}'"
        )));
    }

    if path
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '?' | '#' | '{' | '}' | '%' | '*'))
    {
        return Err(TrackerError::config(format!(
            "path contains characters not allowed in a route, got '{path}'"
        )));
    }

    if path[1..]
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(TrackerError::config(format!(
            "path must not contain empty, '.' or '..' segments, got '{path}'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> TrackerConfig {
        TrackerConfig::new(8080, "localhost:8080", "/pixel")
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = valid();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheme, Scheme::Http);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.dispatch.queue_capacity, 10_000);
    }

    #[test]
    fn test_port_zero_rejected() {
        let mut config = valid();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_validation() {
        for domain in ["localhost", "t.example.com", "t.example.com:8443", "127.0.0.1:80", "[::1]:8080"] {
            let mut config = valid();
            config.domain = domain.to_string();
            assert!(config.validate().is_ok(), "expected '{domain}' to be valid");
        }

        for domain in ["", "http://example.com", "example.com/path", "a b", "user@host", "host?x", "host:notaport"] {
            let mut config = valid();
            config.domain = domain.to_string();
            assert!(config.validate().is_err(), "expected '{domain}' to be rejected");
        }
    }

    #[test]
    fn test_path_validation() {
        for path in ["/pixel", "/t/open", "/o.gif"] {
            let mut config = valid();
            config.path = path.to_string();
            assert!(config.validate().is_ok(), "expected '{path}' to be valid");
        }

        for path in ["", "pixel", "/", "/pixel/", "/a//b", "/a/../b", "/{id}", "/p x", "/p?q", "/p%20"] {
            let mut config = valid();
            config.path = path.to_string();
            assert!(config.validate().is_err(), "expected '{path}' to be rejected");
        }
    }

    #[test]
    fn test_dispatch_limits() {
        let mut config = valid();
        config.dispatch.queue_capacity = 0;
        assert!(config.validate().is_err());

        config.dispatch.queue_capacity = 100;
        config.dispatch.concurrency = 0;
        assert!(config.validate().is_err());

        config.dispatch.concurrency = 257;
        assert!(config.validate().is_err());

        config.dispatch.concurrency = 8;
        config.dispatch.callback_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.dispatch.callback_timeout = Duration::from_millis(100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_token_secret_rejected() {
        assert!(valid().with_token_secret("").validate().is_err());
        assert!(valid().with_token_secret("key").validate().is_ok());
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Https);
        assert!("ftp".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_ipv6_listen_addr() {
        let config = valid().with_listen_host("::1");
        assert_eq!(config.listen_addr(), "[::1]:8080");
    }
}
