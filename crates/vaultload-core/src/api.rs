//! Wire types for the proxy HTTP surface (`/api/vault/*`).
//!
//! Shared by `vaultload-server` (which serves them) and
//! [`crate::gateway::ProxyGateway`] (which calls them). Field names are
//! camelCase on the wire. Request fields are optional so the server can
//! answer missing input with its own JSON error instead of an extractor
//! rejection.

use serde::{Deserialize, Serialize};

use crate::group::SecretData;

/// `POST /api/vault/test`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// `POST /api/vault/auth/token`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAuthRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// `POST /api/vault/auth/approle`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAuthRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub secret_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// `POST /api/vault/secrets`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSecretRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default)]
    pub data: Option<SecretData>,
}

/// Response of `/api/vault/test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConnectionResponse {
    pub success: bool,
}

/// Response of every other `/api/vault/*` route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful response without a token.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Successful response carrying a client token.
    #[must_use]
    pub fn with_token(token: String) -> Self {
        Self {
            success: true,
            token: Some(token),
            error: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            error: Some(error.into()),
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Treat a blank namespace as absent.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn approle_request_uses_camel_case() {
        let body: AppRoleAuthRequest = serde_json::from_str(
            r#"{"url":"http://v","roleId":"r","secretId":"s","namespace":"ns"}"#,
        )
        .unwrap();
        assert_eq!(body.role_id.as_deref(), Some("r"));
        assert_eq!(body.secret_id.as_deref(), Some("s"));
        assert_eq!(body.namespace.as_deref(), Some("ns"));
    }

    #[test]
    fn write_request_tolerates_missing_fields() {
        let body: WriteSecretRequest = serde_json::from_str(r#"{"secretName":"svc"}"#).unwrap();
        assert_eq!(body.secret_name.as_deref(), Some("svc"));
        assert!(body.data.is_none());
    }

    #[test]
    fn failure_response_omits_token() {
        let json = serde_json::to_value(ApiResponse::failure("permission denied")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "permission denied"})
        );
    }

    #[test]
    fn blank_namespace_is_absent() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some("ns")), Some("ns"));
        assert_eq!(non_empty(None), None);
    }
}
