use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::storage::BlobError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid API key")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),
}

/// Body of every failed API response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub result: bool,
    pub error_type: String,
    pub error_message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Blob(BlobError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Blob(BlobError::InvalidName(_) | BlobError::Empty) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Blob(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when a rusqlite error is a UNIQUE or PRIMARY KEY violation.
    /// Foreign key, CHECK and NOT NULL failures do not count.
    pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Database error".to_string()
            }
            AppError::Blob(e) if status.is_server_error() => {
                tracing::error!("Blob storage error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            result: false,
            error_type: status.canonical_reason().unwrap_or("Error").to_string(),
            error_message: message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(format!("Multipart error: {}", err.body_text()))
    }
}

pub type AppResult<T> = Result<T, AppError>;
