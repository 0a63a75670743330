use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::booking::BookingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unable to load availability")]
    AvailabilityUnavailable,

    #[error("this slot was just taken, please pick another time")]
    SlotTaken,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("payment provider error: {0}")]
    Payment(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::SlotTaken => AppError::SlotTaken,
            BookingError::Invalid(msg) => AppError::Validation(msg),
            BookingError::Internal(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::AvailabilityUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SlotTaken => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Ai(_) => StatusCode::BAD_GATEWAY,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
