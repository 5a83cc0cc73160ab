//! Direct client for the backend's `/v1/*` HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::{
    APPROLE_AUTH_FAILED, NAMESPACE_HEADER, SecretWrite, SecretsGateway, TOKEN_AUTH_FAILED,
    TOKEN_HEADER, WRITE_FAILED, first_backend_error, http_client, secret_api_path,
};
use crate::error::GatewayError;

const LOOKUP_SELF_PATH: &str = "/v1/auth/token/lookup-self";
const APPROLE_LOGIN_PATH: &str = "/v1/auth/approle/login";

/// Gateway that calls the secrets backend directly.
#[derive(Debug, Clone)]
pub struct VaultGateway {
    http: reqwest::Client,
}

/// A backend response whose body parsed as JSON (or was empty).
struct BackendResponse {
    status: StatusCode,
    body: Value,
}

impl BackendResponse {
    /// Turn a non-2xx response into an error using the backend's message.
    fn into_result(self, fallback: &str) -> Result<Value, GatewayError> {
        if self.status.is_success() {
            return Ok(self.body);
        }
        let message = first_backend_error(&self.body).unwrap_or(fallback).to_owned();
        Err(GatewayError::Backend {
            status: self.status.as_u16(),
            message,
        })
    }
}

impl VaultGateway {
    /// Create a gateway with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(timeout)?,
        })
    }

    fn url(base_url: &str, path: &str) -> String {
        format!("{}{path}", base_url.trim_end_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<BackendResponse, GatewayError> {
        let response = request.header(CONTENT_TYPE, "application/json").send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|_| GatewayError::InvalidJson {
                status: status.as_u16(),
                body: text.clone(),
            })?
        };

        Ok(BackendResponse { status, body })
    }

    async fn lookup_self(
        &self,
        base_url: &str,
        token: &str,
        namespace: Option<&str>,
    ) -> Result<BackendResponse, GatewayError> {
        let mut request = self
            .http
            .get(Self::url(base_url, LOOKUP_SELF_PATH))
            .header(TOKEN_HEADER, token);
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            request = request.header(NAMESPACE_HEADER, ns);
        }
        self.send(request).await
    }
}

#[async_trait]
impl SecretsGateway for VaultGateway {
    async fn test_connection(&self, base_url: &str, token: &str) -> bool {
        match self.lookup_self(base_url, token, None).await {
            Ok(response) => {
                debug!(status = response.status.as_u16(), "connection probe answered");
                response.status.is_success()
            }
            Err(e) => {
                debug!(error = %e, "connection probe failed");
                false
            }
        }
    }

    async fn authenticate_token(
        &self,
        base_url: &str,
        token: &str,
        namespace: Option<&str>,
    ) -> Result<String, GatewayError> {
        self.lookup_self(base_url, token, namespace)
            .await?
            .into_result(TOKEN_AUTH_FAILED)?;
        debug!("token validated");
        Ok(token.to_owned())
    }

    async fn authenticate_approle(
        &self,
        base_url: &str,
        role_id: &str,
        secret_id: &str,
        namespace: Option<&str>,
    ) -> Result<String, GatewayError> {
        let mut request = self
            .http
            .post(Self::url(base_url, APPROLE_LOGIN_PATH))
            .json(&serde_json::json!({
                "role_id": role_id,
                "secret_id": secret_id,
            }));
        if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
            request = request.header(NAMESPACE_HEADER, ns);
        }

        let body = self.send(request).await?.into_result(APPROLE_AUTH_FAILED)?;

        let token = body
            .pointer("/auth/client_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingToken)?;

        debug!("approle login issued a client token");
        Ok(token.to_owned())
    }

    async fn write_secret(&self, write: &SecretWrite<'_>) -> Result<(), GatewayError> {
        let path = secret_api_path(write.base_path, write.secret_name);
        let mut request = self
            .http
            .post(Self::url(write.base_url, &path))
            .header(TOKEN_HEADER, write.token)
            .json(&serde_json::json!({ "data": write.data }));
        if let Some(ns) = write.namespace.filter(|ns| !ns.is_empty()) {
            request = request.header(NAMESPACE_HEADER, ns);
        }

        let response = self.send(request).await?;
        debug!(path = %path, status = response.status.as_u16(), "secret write answered");
        response.into_result(WRITE_FAILED)?;
        Ok(())
    }
}
