//! HTTP error type for `vaultload-server`.
//!
//! Every failure answers with the same body shape the routes use for
//! success, `{"success": false, "error": "<message>"}`, so clients only ever
//! look at one field.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use vaultload_core::api::ApiResponse;
use vaultload_core::error::GatewayError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client sent incomplete or malformed input.
    #[error("{0}")]
    BadRequest(String),
    /// The backend answered with an error status; it is passed through.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },
    /// The backend could not be reached or answered garbage.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status this error is answered with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Backend { status, message } => Self::Upstream {
                status: StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            },
            GatewayError::MissingToken => Self::BadRequest(err.to_string()),
            GatewayError::InvalidJson { .. } | GatewayError::Transport(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
