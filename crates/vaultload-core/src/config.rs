//! Connection settings.
//!
//! A [`ConfigDraft`] is the mutable field bag filled in by the user (CLI
//! flags or a form). [`ConfigDraft::finalize`] validates and normalizes it
//! into a [`VaultConfig`], which is immutable: every change produces a new
//! value, so a run that captured a config is never affected by later edits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::{validate_namespace, validate_vault_path, validate_vault_url};

/// How the session authenticates against the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// A pre-issued client token.
    #[default]
    Token,
    /// Role ID + secret ID exchanged for a client token.
    AppRole,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => f.write_str("token"),
            Self::AppRole => f.write_str("approle"),
        }
    }
}

/// Credentials for exactly one auth mode.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued client token.
    Token { token: String },
    /// `AppRole` credential pair.
    AppRole { role_id: String, secret_id: String },
}

impl Credentials {
    /// The auth mode these credentials belong to.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Token { .. } => AuthMode::Token,
            Self::AppRole { .. } => AuthMode::AppRole,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"[redacted]")
                .finish(),
            Self::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"[redacted]")
                .finish(),
        }
    }
}

/// Raw, unvalidated connection settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigDraft {
    /// Backend base URL, e.g. `https://vault.example.com`.
    pub backend_url: String,
    /// Optional enterprise namespace. Blank means none.
    pub namespace: String,
    /// Base path secrets are written under, e.g. `kv/data/app`.
    pub base_path: String,
    /// Selected auth mode.
    pub auth_mode: AuthMode,
    /// Token for [`AuthMode::Token`].
    pub token: Option<String>,
    /// Role ID for [`AuthMode::AppRole`].
    pub role_id: Option<String>,
    /// Secret ID for [`AuthMode::AppRole`].
    pub secret_id: Option<String>,
}

impl ConfigDraft {
    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking URL, namespace,
    /// base path, then credentials.
    pub fn finalize(&self) -> Result<VaultConfig, ConfigError> {
        let backend_url = validate_vault_url(&self.backend_url).map_err(ConfigError::Url)?;
        let namespace = validate_namespace(&self.namespace).map_err(ConfigError::Namespace)?;
        let base_path = validate_vault_path(&self.base_path)
            .map_err(ConfigError::BasePath)?
            .normalized;

        let credentials = match self.auth_mode {
            AuthMode::Token => {
                let token = non_blank(self.token.as_deref()).ok_or(ConfigError::MissingToken)?;
                Credentials::Token { token }
            }
            AuthMode::AppRole => {
                let role_id = non_blank(self.role_id.as_deref());
                let secret_id = non_blank(self.secret_id.as_deref());
                match (role_id, secret_id) {
                    (Some(role_id), Some(secret_id)) => Credentials::AppRole { role_id, secret_id },
                    _ => return Err(ConfigError::MissingAppRoleCredentials),
                }
            }
        };

        Ok(VaultConfig {
            backend_url,
            namespace,
            base_path,
            credentials,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Validated, normalized connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    backend_url: String,
    namespace: Option<String>,
    base_path: String,
    credentials: Credentials,
}

impl VaultConfig {
    /// Backend base URL without a trailing slash.
    #[must_use]
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Namespace, if one is configured.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Base path secrets are written under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Credentials for the configured auth mode.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Configured auth mode.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    /// Advisory about the base path, if any.
    #[must_use]
    pub fn path_warning(&self) -> Option<&'static str> {
        validate_vault_path(&self.base_path)
            .ok()
            .and_then(|valid| valid.warning)
    }

    /// Copy with a different base path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BasePath`] if the path is invalid.
    pub fn with_base_path(&self, base_path: &str) -> Result<Self, ConfigError> {
        let base_path = validate_vault_path(base_path)
            .map_err(ConfigError::BasePath)?
            .normalized;
        Ok(Self {
            base_path,
            ..self.clone()
        })
    }

    /// Copy with a different namespace. Blank clears it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Namespace`] if the namespace is invalid.
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, ConfigError> {
        let namespace = validate_namespace(namespace).map_err(ConfigError::Namespace)?;
        Ok(Self {
            namespace,
            ..self.clone()
        })
    }

    /// Copy with different credentials.
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials,
            ..self.clone()
        }
    }
}
