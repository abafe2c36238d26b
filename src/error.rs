use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("vehicle is not available: {count} conflicting booking(s)")]
    Conflict { count: usize, ids: Vec<Uuid> },

    #[error("booking {0} not found")]
    NotFound(Uuid),

    #[error("booking {0} not found")]
    UnknownBooking(String),

    #[error("cannot move booking from {current} to {attempted}")]
    InvalidTransition {
        current: BookingStatus,
        attempted: BookingStatus,
    },

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Conflict { .. } => "conflict",
            AppError::NotFound(_) | AppError::UnknownBooking(_) => "not_found",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::UnknownBooking(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string(),
        });

        match &self {
            AppError::Conflict { count, ids } => {
                body["conflictCount"] = json!(count);
                body["conflictingIds"] = json!(ids);
            }
            AppError::InvalidTransition { current, attempted } => {
                body["currentStatus"] = json!(current);
                body["attemptedStatus"] = json!(attempted);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
