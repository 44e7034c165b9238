use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::payments::SignatureError;

/// User-facing error messages shared between handlers and tests.
pub mod msg {
    pub const INVALID_AMOUNT: &str = "Invalid amount";
    pub const INVALID_CURRENCY: &str = "Invalid currency";
    pub const WEBHOOK_ERROR: &str = "Webhook Error";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Webhook verification failed: {0}")]
    Webhook(#[from] SignatureError),

    #[error("Payment processor error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        // Body limit rejections keep their 413
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone())),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload too large",
                Some(msg.clone()),
            ),
            AppError::Webhook(e) => {
                tracing::warn!("Webhook signature verification failed: {}", e);
                (StatusCode::BAD_REQUEST, msg::WEBHOOK_ERROR, Some(e.to_string()))
            }
            AppError::Upstream(msg) => {
                tracing::error!("Payment processor error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Payment processor error",
                    Some(msg.clone()),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_is_400() {
        let response = AppError::BadRequest(msg::INVALID_AMOUNT.into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn webhook_error_is_400() {
        let response = AppError::Webhook(SignatureError::MissingHeader).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn payload_too_large_is_413() {
        let response = AppError::PayloadTooLarge("length limit exceeded".into()).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn upstream_error_is_500() {
        let response = AppError::Upstream("card_declined".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
