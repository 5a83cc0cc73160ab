//! Gateway that routes every call through a `vaultload-server` instance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    APPROLE_AUTH_FAILED, SecretWrite, SecretsGateway, TOKEN_AUTH_FAILED, WRITE_FAILED,
    http_client,
};
use crate::api::{
    ApiResponse, AppRoleAuthRequest, TestConnectionRequest, TestConnectionResponse,
    TokenAuthRequest, WriteSecretRequest,
};
use crate::error::GatewayError;

/// Gateway that calls the proxy's `/api/vault/*` routes.
///
/// The `base_url` passed to each operation is forwarded in the request body;
/// the proxy itself is fixed at construction.
#[derive(Debug, Clone)]
pub struct ProxyGateway {
    http: reqwest::Client,
    proxy_url: String,
}

impl ProxyGateway {
    /// Create a gateway for the proxy at `proxy_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(proxy_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(timeout)?,
            proxy_url: proxy_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Proxy base URL without a trailing slash.
    #[must_use]
    pub fn proxy_url(&self) -> &str {
        &self.proxy_url
    }

    async fn post<B, R>(&self, route: &str, body: &B) -> Result<(StatusCode, Option<R>), GatewayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/api/vault/{route}", self.proxy_url);
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(route, status = status.as_u16(), "proxy answered");

        if text.trim().is_empty() {
            return Ok((status, None));
        }
        match serde_json::from_str(&text) {
            Ok(parsed) => Ok((status, Some(parsed))),
            Err(_) if status.is_success() => Err(GatewayError::InvalidJson {
                status: status.as_u16(),
                body: text,
            }),
            Err(_) => Ok((status, None)),
        }
    }

    /// Post to an `ApiResponse` route and fail unless the proxy reports success.
    async fn call<B>(&self, route: &str, body: &B, fallback: &str) -> Result<ApiResponse, GatewayError>
    where
        B: Serialize + Sync,
    {
        let (status, parsed) = self.post::<B, ApiResponse>(route, body).await?;
        match parsed {
            Some(response) if status.is_success() && response.success => Ok(response),
            Some(ApiResponse {
                error: Some(message),
                ..
            }) if !message.is_empty() => Err(GatewayError::Backend {
                status: status.as_u16(),
                message,
            }),
            _ => Err(GatewayError::Backend {
                status: status.as_u16(),
                message: fallback.to_owned(),
            }),
        }
    }
}

#[async_trait]
impl SecretsGateway for ProxyGateway {
    async fn test_connection(&self, base_url: &str, token: &str) -> bool {
        let body = TestConnectionRequest {
            url: Some(base_url.to_owned()),
            token: Some(token.to_owned()),
        };
        match self.post::<_, TestConnectionResponse>("test", &body).await {
            Ok((status, Some(response))) => status.is_success() && response.success,
            Ok((_, None)) => false,
            Err(e) => {
                debug!(error = %e, "proxy connection probe failed");
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
        let body = TokenAuthRequest {
            url: Some(base_url.to_owned()),
            token: Some(token.to_owned()),
            namespace: namespace.map(str::to_owned),
        };
        let response = self.call("auth/token", &body, TOKEN_AUTH_FAILED).await?;
        Ok(response.token.unwrap_or_else(|| token.to_owned()))
    }

    async fn authenticate_approle(
        &self,
        base_url: &str,
        role_id: &str,
        secret_id: &str,
        namespace: Option<&str>,
    ) -> Result<String, GatewayError> {
        let body = AppRoleAuthRequest {
            url: Some(base_url.to_owned()),
            role_id: Some(role_id.to_owned()),
            secret_id: Some(secret_id.to_owned()),
            namespace: namespace.map(str::to_owned),
        };
        let response = self
            .call("auth/approle", &body, APPROLE_AUTH_FAILED)
            .await?;
        response
            .token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingToken)
    }

    async fn write_secret(&self, write: &SecretWrite<'_>) -> Result<(), GatewayError> {
        let body = WriteSecretRequest {
            url: Some(write.base_url.to_owned()),
            token: Some(write.token.to_owned()),
            namespace: write.namespace.map(str::to_owned),
            path: Some(write.base_path.to_owned()),
            secret_name: Some(write.secret_name.to_owned()),
            data: Some(write.data.clone()),
        };
        self.call("secrets", &body, WRITE_FAILED).await?;
        Ok(())
    }
}
