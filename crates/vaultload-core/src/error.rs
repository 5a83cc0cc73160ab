//! Error types for `vaultload-core`.
//!
//! Every `Display` string here is user-facing: the CLI prints it verbatim and
//! the proxy server returns it in the `error` field of its JSON responses.
//! Error values never carry tokens or secret values.

use std::fmt;
use std::path::PathBuf;

/// Which form field a path-style validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    /// The secrets base path.
    Path,
    /// The enterprise namespace.
    Namespace,
}

impl fmt::Display for PathField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => f.write_str("Path"),
            Self::Namespace => f.write_str("Namespace"),
        }
    }
}

/// Errors from the field validation helpers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The backend URL is empty.
    #[error("Vault URL is required")]
    UrlRequired,

    /// The backend URL is not `http` or `https`.
    #[error("Vault URL must use HTTP or HTTPS protocol")]
    UrlScheme,

    /// The backend URL has no host.
    #[error("Vault URL must include a valid hostname")]
    UrlHost,

    /// The backend URL could not be parsed at all.
    #[error("Please enter a valid URL (e.g., https://vault.example.com)")]
    UrlMalformed,

    /// The secrets path is empty.
    #[error("Secrets path is required")]
    PathRequired,

    /// One of `< > : " | ? *` appears in the value.
    #[error("{field} contains invalid characters. Avoid: < > : \" | ? *")]
    InvalidCharacters { field: PathField },

    /// The value contains `//`.
    #[error("{field} cannot contain consecutive slashes")]
    ConsecutiveSlashes { field: PathField },

    /// The value starts with `/`.
    #[error("{field} should not start with a slash")]
    LeadingSlash { field: PathField },

    /// The value ends with `/`.
    #[error("{field} should not end with a slash")]
    TrailingSlash { field: PathField },

    /// A segment is longer than 255 characters.
    #[error("{field} segments cannot exceed 255 characters")]
    SegmentTooLong { field: PathField },

    /// A segment contains characters outside `[A-Za-z0-9._-]`.
    #[error("{field} segments can only contain letters, numbers, hyphens, underscores, and dots")]
    SegmentCharacters { field: PathField },
}

/// Errors from finalizing a [`crate::config::ConfigDraft`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The backend URL failed validation.
    #[error("{0}")]
    Url(ValidationError),

    /// The base path failed validation.
    #[error("{0}")]
    BasePath(ValidationError),

    /// The namespace failed validation.
    #[error("{0}")]
    Namespace(ValidationError),

    /// Token mode selected without a token.
    #[error("Token is required")]
    MissingToken,

    /// `AppRole` mode selected without both credentials.
    #[error("Role ID and Secret ID are required")]
    MissingAppRoleCredentials,
}

/// Errors from a single backend (or proxy) call.
///
/// `Display` yields the normalized human-readable message: the backend's
/// first reported error, an operation-specific fallback, or the transport
/// failure text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// `AppRole` login succeeded but the response carried no client token.
    #[error("Authentication successful but no token received")]
    MissingToken,

    /// The backend answered with a body that is not JSON.
    #[error("Invalid JSON response: {body}")]
    InvalidJson { status: u16, body: String },

    /// The request never produced a response (DNS, refused, timeout, ...).
    #[error("{0}")]
    Transport(String),
}

impl GatewayError {
    /// HTTP status reported by the backend, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } | Self::InvalidJson { status, .. } => Some(*status),
            Self::MissingToken | Self::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors from the authentication step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token mode with an empty token.
    #[error("Token is required")]
    MissingToken,

    /// `AppRole` mode with an empty role or secret id.
    #[error("Role ID and Secret ID are required")]
    MissingAppRoleCredentials,

    /// The connectivity probe failed before token validation.
    #[error("Cannot connect to Vault server")]
    Unreachable,

    /// The backend rejected the credentials or could not be reached.
    #[error("{0}")]
    Rejected(#[from] GatewayError),
}

/// Errors from writing a result report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Creating or writing the report file failed.
    #[error("failed to write report '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
