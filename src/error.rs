//! HTTP error mapping for the API layer.

use crate::services::TradingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<TradingError> for AppError {
    fn from(err: TradingError) -> Self {
        let status = match &err {
            TradingError::PositionNotFound(_) => StatusCode::NOT_FOUND,
            TradingError::InsufficientBalance { .. }
            | TradingError::PositionNotOpen(_)
            | TradingError::PositionNotPending(_)
            | TradingError::PriceUnavailable(_) => StatusCode::BAD_REQUEST,
            TradingError::Database(inner) => {
                error!(error = %inner, "database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
