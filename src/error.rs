use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Upstream service error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Separates an unreachable database from a failed query.
    pub(crate) fn from_db(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) {
            Self::StorageUnavailable(e.to_string())
        } else {
            Self::Storage(e)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(msg) => {
                tracing::debug!(message = %msg, "Validation failed");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Storage(e) => {
                tracing::error!(error = %e, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::StorageUnavailable(msg) => {
                tracing::error!(message = %msg, "Storage unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            Self::Unauthorized => {
                tracing::debug!("Request not authorized");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::Upstream(msg) => {
                tracing::warn!(message = %msg, "Upstream service error");
                (StatusCode::BAD_GATEWAY, msg)
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}
