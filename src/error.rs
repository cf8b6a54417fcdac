use axum::{
    Json,
    extract::{FromRequest, multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// AppError
///
/// The single failure type returned by every handler, service, and repository call.
/// Each variant maps to exactly one HTTP status; the message is rendered into the
/// `{"error": "..."}` envelope by the `IntoResponse` implementation below.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),
    /// Unknown username or wrong password. Both cases share one message (401).
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The account exists but has been disabled (401).
    #[error("Account is disabled")]
    AccountInactive,
    /// Missing, malformed, or expired bearer token (401).
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but lacking the required role (403).
    #[error("Unauthorized access")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    /// Storage or unexpected failure. The message is surfaced as-is (500).
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::AccountInactive
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(format!("Database error: {e}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Internal(format!("File storage error: {e}"))
    }
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Internal(format!("Export failed: {e}"))
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// ApiJson
///
/// Drop-in replacement for `axum::Json` whose rejection is an `AppError`, so that
/// malformed JSON bodies produce the same `{"error": ...}` envelope as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
