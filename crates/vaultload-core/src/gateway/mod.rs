//! Backend gateway: the four logical operations the pipeline needs from a
//! secrets backend.
//!
//! [`VaultGateway`] speaks the backend's `/v1/*` HTTP API directly.
//! [`ProxyGateway`] goes through a `vaultload-server` instance instead, for
//! callers that cannot reach the backend themselves. Both normalize every
//! failure into a [`GatewayError`] whose `Display` is the message to show.

mod proxy;
mod vault;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::group::SecretData;

pub use proxy::ProxyGateway;
pub use vault::VaultGateway;

/// Default per-request timeout for backend calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the client token.
pub const TOKEN_HEADER: &str = "X-Vault-Token";

/// Header carrying the enterprise namespace.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Fallback message when token validation fails without a backend message.
pub const TOKEN_AUTH_FAILED: &str = "Vault auth failed";

/// Fallback message when `AppRole` login fails without a backend message.
pub const APPROLE_AUTH_FAILED: &str = "AppRole authentication failed";

/// Fallback message when a write fails without a backend message.
pub const WRITE_FAILED: &str = "Failed to store secret";

/// Everything needed to write one secret.
#[derive(Debug, Clone, Copy)]
pub struct SecretWrite<'a> {
    /// Backend base URL.
    pub base_url: &'a str,
    /// Client token.
    pub token: &'a str,
    /// Namespace header value, if any.
    pub namespace: Option<&'a str>,
    /// Configured base path (may carry a `kv/data/` prefix).
    pub base_path: &'a str,
    /// Last path segment.
    pub secret_name: &'a str,
    /// Keys and values to store.
    pub data: &'a SecretData,
}

/// Operations the upload pipeline performs against a secrets backend.
///
/// Implementations never panic and never let a transport fault escape:
/// every failure comes back as a [`GatewayError`].
#[async_trait]
pub trait SecretsGateway: Send + Sync {
    /// Probe the backend with the token's self-lookup. `true` iff 2xx.
    async fn test_connection(&self, base_url: &str, token: &str) -> bool;

    /// Validate a pre-issued token. Returns the same token on success.
    async fn authenticate_token(
        &self,
        base_url: &str,
        token: &str,
        namespace: Option<&str>,
    ) -> Result<String, GatewayError>;

    /// Exchange `AppRole` credentials for a client token.
    async fn authenticate_approle(
        &self,
        base_url: &str,
        role_id: &str,
        secret_id: &str,
        namespace: Option<&str>,
    ) -> Result<String, GatewayError>;

    /// Store one secret under the KV v2 data prefix.
    async fn write_secret(&self, write: &SecretWrite<'_>) -> Result<(), GatewayError>;
}

/// Strip leading `/` and `kv/data/` prefixes from a base path.
///
/// Writes always target `/v1/kv/data/...`, so a configured path that already
/// carries the prefix must not double it. Stripping repeats until neither
/// prefix remains, which makes the function idempotent.
#[must_use]
pub fn normalize_base_path(path: &str) -> &str {
    let mut rest = path;
    loop {
        if let Some(stripped) = rest.strip_prefix('/') {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("kv/data/") {
            rest = stripped;
        } else {
            return rest;
        }
    }
}

/// Backend API path for a secret write.
///
/// The secret name is encoded as one path segment, so a `/` in it is sent
/// as `%2F` rather than creating a nested path.
#[must_use]
pub fn secret_api_path(base_path: &str, secret_name: &str) -> String {
    format!(
        "/v1/kv/data/{}/{}",
        normalize_base_path(base_path),
        urlencoding::encode(secret_name)
    )
}

/// First entry of the backend's `errors` array, if it is a non-empty string.
#[must_use]
pub fn first_backend_error(body: &Value) -> Option<&str> {
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
        .filter(|msg| !msg.is_empty())
}

/// Build the shared HTTP client used by both gateways.
fn http_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vaultload/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(GatewayError::from)
}
