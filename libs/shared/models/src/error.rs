use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Past time: {0}")]
    PastTime(String),

    #[error("Duplicated: {0}")]
    Duplicated(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable error code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "E_INVALID_INPUT",
            AppError::InvalidTime(_) => "E_INVALID_TIME",
            AppError::PastTime(_) => "E_PAST_TIME",
            AppError::Duplicated(_) => "E_DUPLICATED",
            AppError::NotFound(_) => "E_NOT_FOUND",
            AppError::Database(_) | AppError::Internal(_) => "E_INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidTime(_) | AppError::PastTime(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Duplicated(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::InvalidInput(msg)
            | AppError::InvalidTime(msg)
            | AppError::PastTime(msg)
            | AppError::Duplicated(msg)
            | AppError::NotFound(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("Error: {} {}: {}", status, code, message);
        } else {
            tracing::warn!("Error: {} {}: {}", status, code, message);
        }

        let body = Json(json!({
            "error": code,
            "message": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
