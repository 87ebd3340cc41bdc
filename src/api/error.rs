//! Error responses.

use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{CatalogError, DeliveryError, StoreError, TurnError};

/// Failures that map to a non-2xx response. Each body carries a stable
/// `status` string clients can branch on.
#[derive(Debug)]
pub enum ApiError {
    RateLimited { retry_after_secs: u64 },
    SessionKeyMalformed(String),
    InvalidInput(String),
    InvalidPhone(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn rate_limited(retry_after: Duration) -> Self {
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        Self::RateLimited {
            retry_after_secs: secs.max(1),
        }
    }
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::SessionKeyMalformed(msg) => Self::SessionKeyMalformed(msg),
            TurnError::Store(StoreError::Unavailable(msg)) => Self::Unavailable(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::InvalidRecipient(msg) => Self::InvalidPhone(msg),
            DeliveryError::NotFound { id } => Self::NotFound(format!("Scheme {id} not found")),
            DeliveryError::RateLimited { retry_after } => Self::rate_limited(retry_after),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RateLimited { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "status": "rate_limited",
                        "rate_limited": true,
                        "message": "Too many requests. Please wait before trying again.",
                        "retry_after_secs": retry_after_secs,
                    })),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            ApiError::SessionKeyMalformed(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "session_key_malformed", "message": msg})),
            )
                .into_response(),
            ApiError::InvalidInput(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"status": "invalid_input", "message": msg})),
            )
                .into_response(),
            ApiError::InvalidPhone(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "invalid_phone", "message": msg})),
            )
                .into_response(),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(json!({"status": "not_found", "message": msg})),
            )
                .into_response(),
            ApiError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "status": "unavailable",
                        "message": "The service is busy. Please try again shortly.",
                    })),
                )
                    .into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": "error", "message": "An internal error occurred"})),
                )
                    .into_response()
            }
        }
    }
}
