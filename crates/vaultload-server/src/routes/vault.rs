//! Proxy routes for the secrets backend.
//!
//! Endpoints:
//! - `POST /api/vault/test`: connectivity probe with a token
//! - `POST /api/vault/auth/token`: validate a token (optionally in a namespace)
//! - `POST /api/vault/auth/approle`: exchange `AppRole` credentials for a token
//! - `POST /api/vault/secrets`: write one secret under the KV v2 data prefix

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};

use vaultload_core::api::{
    ApiResponse, AppRoleAuthRequest, TestConnectionRequest, TestConnectionResponse,
    TokenAuthRequest, WriteSecretRequest, non_empty,
};
use vaultload_core::gateway::{SecretWrite, SecretsGateway};

use crate::error::ApiError;
use crate::state::AppState;

const MISSING_URL_OR_TOKEN: &str = "URL and token are required";
const MISSING_APPROLE_FIELDS: &str = "URL, Role ID and Secret ID are required";
const MISSING_WRITE_FIELDS: &str = "Missing required parameters";

/// Build the `/api/vault` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/test", post(test_connection))
        .route("/auth/token", post(token_auth))
        .route("/auth/approle", post(approle_auth))
        .route("/secrets", post(write_secret))
}

fn required<'a>(value: Option<&'a String>, message: &str) -> Result<&'a str, ApiError> {
    non_empty(value.map(String::as_str)).ok_or_else(|| ApiError::BadRequest(message.to_owned()))
}

async fn test_connection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TestConnectionRequest>, JsonRejection>,
) -> Result<Json<TestConnectionResponse>, ApiError> {
    let Json(body) = payload?;
    let url = required(body.url.as_ref(), MISSING_URL_OR_TOKEN)?;
    let token = required(body.token.as_ref(), MISSING_URL_OR_TOKEN)?;

    let success = state.gateway.test_connection(url, token).await;
    Ok(Json(TestConnectionResponse { success }))
}

async fn token_auth(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TokenAuthRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(body) = payload?;
    let url = required(body.url.as_ref(), MISSING_URL_OR_TOKEN)?;
    let token = required(body.token.as_ref(), MISSING_URL_OR_TOKEN)?;
    let namespace = non_empty(body.namespace.as_deref());

    let token = state
        .gateway
        .authenticate_token(url, token, namespace)
        .await
        .inspect_err(|e| warn!(error = %e, "token auth failed"))?;
    Ok(Json(ApiResponse::with_token(token)))
}

async fn approle_auth(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AppRoleAuthRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(body) = payload?;
    let url = required(body.url.as_ref(), MISSING_APPROLE_FIELDS)?;
    let role_id = required(body.role_id.as_ref(), MISSING_APPROLE_FIELDS)?;
    let secret_id = required(body.secret_id.as_ref(), MISSING_APPROLE_FIELDS)?;
    let namespace = non_empty(body.namespace.as_deref());

    let token = state
        .gateway
        .authenticate_approle(url, role_id, secret_id, namespace)
        .await
        .inspect_err(|e| warn!(error = %e, "approle auth failed"))?;
    info!("approle login succeeded");
    Ok(Json(ApiResponse::with_token(token)))
}

async fn write_secret(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WriteSecretRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    let Json(body) = payload?;
    let url = required(body.url.as_ref(), MISSING_WRITE_FIELDS)?;
    let token = required(body.token.as_ref(), MISSING_WRITE_FIELDS)?;
    let base_path = required(body.path.as_ref(), MISSING_WRITE_FIELDS)?;
    let secret_name = required(body.secret_name.as_ref(), MISSING_WRITE_FIELDS)?;
    let data = body
        .data
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest(MISSING_WRITE_FIELDS.to_owned()))?;

    state
        .gateway
        .write_secret(&SecretWrite {
            base_url: url,
            token,
            namespace: non_empty(body.namespace.as_deref()),
            base_path,
            secret_name,
            data,
        })
        .await
        .inspect_err(|e| warn!(secret = secret_name, error = %e, "secret upload failed"))?;
    Ok(Json(ApiResponse::ok()))
}
