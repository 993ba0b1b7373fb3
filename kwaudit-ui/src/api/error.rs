//! API error type
//!
//! Every failure is rendered as `{"error": {"code", "message"}}`; an
//! authorization failure also carries `error.redirect` pointing at the
//! login page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kwaudit_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Identity missing or expired (401)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, redirect: String },

    /// Analysis backend failed (502)
    #[error("Backend error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Csv(e) => ApiError::BadRequest(format!("Could not parse CSV: {}", e)),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            // Callers with a backend URL use AppState::backend to add the redirect
            Error::Unauthorized(msg) => ApiError::Unauthorized {
                message: msg,
                redirect: String::new(),
            },
            Error::Backend { status, message } => {
                ApiError::BadGateway(format!("Backend returned {}: {}", status, message))
            }
            Error::Http(e) => ApiError::BadGateway(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, redirect) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::Unauthorized { message, redirect } => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                message,
                Some(redirect).filter(|r| !r.is_empty()),
            ),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR", msg, None),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        if let Some(redirect) = redirect {
            body["error"]["redirect"] = json!(redirect);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
