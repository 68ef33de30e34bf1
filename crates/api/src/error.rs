//! Errors returned by the undo endpoints, rendered as `{"error", "code"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagespace_core::error::CoreError;
use serde_json::json;

/// Failure of an undo request before or outside the engine's per-unit
/// reporting.
///
/// Per-activity reversal failures are not errors here; they travel inside
/// the `UndoResult` body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, malformed, or expired bearer token.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The caller cannot edit the page the checkpoint belongs to.
    #[error("Edit access to this page is required to undo AI changes")]
    NoEditAccess,

    #[error("mode is required")]
    MissingMode,

    #[error("unknown mode '{0}', expected messages_only or messages_and_changes")]
    UnknownMode(String),

    /// The execute body was not valid JSON for the expected shape.
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Checkpoint resolution, scope queries, or message deletion failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::NoEditAccess => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::MissingMode | AppError::UnknownMode(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_MODE")
            }
            AppError::MalformedBody(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Core(core) => match core {
                CoreError::NotFound {
                    entity: "ChatMessage",
                    ..
                } => (StatusCode::NOT_FOUND, "MESSAGE_NOT_FOUND"),
                CoreError::NotFound { entity: "Page", .. } => {
                    (StatusCode::NOT_FOUND, "PAGE_NOT_FOUND")
                }
                CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                CoreError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                CoreError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                CoreError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }

    /// Client-facing message. Internal failures are logged and replaced.
    fn public_message(&self) -> String {
        match self {
            AppError::Core(CoreError::NotFound {
                entity: "ChatMessage",
                id,
            }) => format!("Message {id} not found"),
            AppError::Core(CoreError::NotFound { entity, id }) => {
                format!("{entity} {id} not found")
            }
            AppError::Core(
                CoreError::Validation(msg)
                | CoreError::Conflict(msg)
                | CoreError::Unauthorized(msg)
                | CoreError::Forbidden(msg),
            ) => msg.clone(),
            AppError::Core(CoreError::Internal(msg)) => {
                tracing::error!(error = %msg, "AI undo request failed");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = json!({
            "error": self.public_message(),
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}
