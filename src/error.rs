use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::dto::response::ApiErrorBody;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a handler can produce.
///
/// Rendered as the error envelope; the HTTP status matches `statusCode`.
/// 500-class variants carry the underlying cause for logging only, the client
/// sees the operation message.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    /// The media host failed or rejected the call.
    #[error("{message}")]
    Upstream { message: String, cause: anyhow::Error },
    #[error("{message}")]
    Internal { message: String, cause: anyhow::Error },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        AppError::Internal {
            message: message.into(),
            cause: cause.into(),
        }
    }

    pub fn upstream(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        AppError::Upstream {
            message: message.into(),
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Upstream { message, cause } => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Media service error: {}: {:?}", message, cause);
                ApiErrorBody::new(status, message)
                    .with_errors(json!({ "error_id": error_id.to_string() }))
            }
            AppError::Internal { message, cause } => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {}: {:?}", message, cause);
                ApiErrorBody::new(status, message)
                    .with_errors(json!({ "error_id": error_id.to_string() }))
            }
            other => ApiErrorBody::new(status, other.to_string()),
        };

        body.into_response()
    }
}

/// Attach an operation message to a fallible call, turning it into a 500.
pub trait OrAppError<T> {
    fn or_internal(self, message: &str) -> AppResult<T>;
    fn or_upstream(self, message: &str) -> AppResult<T>;
}

impl<T, E> OrAppError<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_internal(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::internal(message, e))
    }

    fn or_upstream(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::upstream(message, e))
    }
}
