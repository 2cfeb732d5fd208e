use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use autofit_core::error::CoreError;
use autofit_runner::launcher::LaunchError;
use autofit_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store, and launcher errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON
/// error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `autofit_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A status-store fault (I/O or corrupt record).
    #[error("Status store error: {0}")]
    Store(#[from] StoreError),

    /// The worker process could not be started.
    #[error("Failed to launch training job: {0}")]
    Launch(#[from] LaunchError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidTransition { .. } | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::Store(err) => {
                tracing::error!(error = %err, "Status store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            AppError::Launch(err) => {
                tracing::error!(error = %err, "Failed to launch worker process");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LAUNCH_ERROR",
                    "Failed to start the training job".to_string(),
                )
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
