//! API error handling.
//!
//! Structured errors returned by the HTTP adapter. Each error carries an
//! [`ErrorCode`] that fixes its HTTP status, a human-readable message and
//! optional details (for example one entry per invalid request field).
//!
//! # HTTP Status Codes
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `INVALID_REQUEST` | 400 | Malformed or invalid payload |
//! | `ORDER_NOT_FOUND` | 404 | Unknown order ID |
//! | `SERVICE_UNAVAILABLE` | 503 | Store down or queue shutting down |
//! | `INTERNAL_ERROR` | 500 | Unreadable stored order |

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::StoreError;
use crate::application::use_cases::SubmitOrderError;

/// Error codes for the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid request format or fields.
    InvalidRequest,
    /// Order not found.
    OrderNotFound,
    /// A dependency is temporarily unavailable.
    ServiceUnavailable,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Vec<String>,
}

impl ApiError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Payload failed validation.
    pub fn invalid_payload(details: Vec<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid payload").with_details(details)
    }

    /// Order not found.
    pub fn order_not_found(order_id: &str) -> Self {
        Self::new(ErrorCode::OrderNotFound, format!("Order {order_id} not found"))
    }

    /// Dependency unavailable.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert to the JSON body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            error: self.message.clone(),
            code: self.code,
            details: self.details.clone(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: ErrorCode,
    /// Details, omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self.to_http_response())).into_response()
    }
}

impl From<SubmitOrderError> for ApiError {
    fn from(err: SubmitOrderError) -> Self {
        match err {
            SubmitOrderError::Invalid(e) => Self::invalid_payload(vec![e.to_string()]),
            SubmitOrderError::Store(e) => e.into(),
            SubmitOrderError::Queue(e) => Self::unavailable(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Self::unavailable(err.to_string()),
            StoreError::Serialization { .. } => Self::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::OrderError;
    use crate::queue::QueueError;

    #[test]
    fn codes_map_to_http_status() {
        assert_eq!(ErrorCode::InvalidRequest.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::ServiceUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn invalid_payload_body() {
        let body = ApiError::invalid_payload(vec!["tokenIn: required".to_string()]).to_http_response();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "Invalid payload");
        assert_eq!(json["code"], "INVALID_REQUEST");
        assert_eq!(json["details"][0], "tokenIn: required");
    }

    #[test]
    fn empty_details_are_omitted() {
        let json = serde_json::to_value(ApiError::internal("boom").to_http_response()).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn submit_errors_map_to_codes() {
        let invalid: ApiError = SubmitOrderError::Invalid(OrderError::Invalid("x".into())).into();
        assert_eq!(invalid.code(), ErrorCode::InvalidRequest);

        let queue: ApiError = SubmitOrderError::Queue(QueueError::ShuttingDown).into();
        assert_eq!(queue.code(), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn store_errors_split_outage_from_corruption() {
        let down: ApiError = StoreError::Unavailable {
            message: "disk full".to_string(),
        }
        .into();
        assert_eq!(down.code(), ErrorCode::ServiceUnavailable);

        let corrupt: ApiError = SubmitOrderError::Store(StoreError::Serialization {
            message: "bad json".to_string(),
        })
        .into();
        assert_eq!(corrupt.code(), ErrorCode::InternalError);
        assert_eq!(corrupt.code().http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(corrupt.message().contains("bad json"));
    }
}
