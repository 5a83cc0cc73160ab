//! Authentication step: turn a [`VaultConfig`] into a [`Session`].

use std::fmt;

use tracing::{debug, info};

use crate::config::{Credentials, VaultConfig};
use crate::error::{AuthError, GatewayError};
use crate::gateway::SecretsGateway;

/// Message used when the backend rejects credentials without saying why.
pub const AUTH_FAILED: &str = "Authentication failed";

/// A validated configuration frozen together with the client token in use.
///
/// An upload run captures one of these at start, so later configuration
/// edits never reach an in-flight run.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    config: VaultConfig,
    token: String,
}

impl Session {
    /// Pair a configuration with an already-obtained token.
    #[must_use]
    pub fn new(config: VaultConfig, token: impl Into<String>) -> Self {
        Self {
            config,
            token: token.into(),
        }
    }

    /// The configuration this session was opened with.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Client token sent with every write.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Authenticate against the backend with the configured credentials.
///
/// Token mode probes connectivity first, then validates the token (with the
/// namespace, if any). `AppRole` mode logs in and uses the issued token.
///
/// # Errors
///
/// Returns an [`AuthError`] carrying the message to show the user.
pub async fn authenticate<G>(gateway: &G, config: &VaultConfig) -> Result<Session, AuthError>
where
    G: SecretsGateway + ?Sized,
{
    let url = config.backend_url();
    let namespace = config.namespace();

    let token = match config.credentials() {
        Credentials::Token { token } => {
            if token.trim().is_empty() {
                return Err(AuthError::MissingToken);
            }
            if !gateway.test_connection(url, token).await {
                debug!(url, "connectivity probe failed");
                return Err(AuthError::Unreachable);
            }
            gateway
                .authenticate_token(url, token, namespace)
                .await
                .map_err(rejected)?
        }
        Credentials::AppRole { role_id, secret_id } => {
            if role_id.trim().is_empty() || secret_id.trim().is_empty() {
                return Err(AuthError::MissingAppRoleCredentials);
            }
            gateway
                .authenticate_approle(url, role_id, secret_id, namespace)
                .await
                .map_err(rejected)?
        }
    };

    info!(url, mode = %config.auth_mode(), "authenticated");
    Ok(Session::new(config.clone(), token))
}

fn rejected(err: GatewayError) -> AuthError {
    if err.to_string().is_empty() {
        AuthError::Rejected(GatewayError::Backend {
            status: err.status().unwrap_or_default(),
            message: AUTH_FAILED.to_owned(),
        })
    } else {
        AuthError::Rejected(err)
    }
}
