//! Server configuration for `vaultload-server`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `VAULTLOAD_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Timeout applied to every backend call.
    pub request_timeout: Duration,
    /// Maximum number of proxy calls in flight at once.
    pub max_concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            log_level: "info".to_owned(),
            request_timeout: Duration::from_secs(30),
            max_concurrency: 64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `VAULTLOAD_BIND_ADDR`: full bind address (overrides `PORT`, default: `0.0.0.0:3000`)
    /// - `VAULTLOAD_LOG_LEVEL`: log filter (default: `info`)
    /// - `VAULTLOAD_REQUEST_TIMEOUT_SECS`: backend call timeout (default: `30`)
    /// - `VAULTLOAD_MAX_CONCURRENCY`: in-flight proxy call limit (default: `64`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // Priority: VAULTLOAD_BIND_ADDR > PORT > default 0.0.0.0:3000
        let bind_addr = if let Some(addr) = lookup("VAULTLOAD_BIND_ADDR") {
            addr.parse().unwrap_or(defaults.bind_addr)
        } else if let Some(port_str) = lookup("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            defaults.bind_addr
        };

        let log_level = lookup("VAULTLOAD_LOG_LEVEL").unwrap_or(defaults.log_level);

        let request_timeout = lookup("VAULTLOAD_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.request_timeout, Duration::from_secs);

        let max_concurrency = lookup("VAULTLOAD_MAX_CONCURRENCY")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_concurrency);

        Self {
            bind_addr,
            log_level,
            request_timeout,
            max_concurrency,
        }
    }
}
