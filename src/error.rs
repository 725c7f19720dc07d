//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the error type every handler returns. Store conditions
//! map to distinct status codes; infrastructure failures are logged in
//! full and reported to the client as a generic 500.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::StoreError;

/// JSON error body.
///
/// ```json
/// { "error": "task not found" }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Handler-level error with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The path exists but does not accept the request method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// The request body could not be extracted as JSON.
    #[error("{message}")]
    Rejected {
        /// Status chosen by the extractor (400, 413, 415, 422).
        status: StatusCode,
        /// Extractor message.
        message: String,
    },

    /// Error propagated from the store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Rejected { status, .. } => *status,
            Self::Store(StoreError::TaskNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::InvalidTaskStatus(_) | StoreError::UserDoesNotExist(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message shown to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Store(StoreError::TaskNotFound(_)) => "task not found".to_string(),
            Self::Store(err) if err.is_infrastructure() => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        Self::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conditions_map_to_distinct_statuses() {
        assert_eq!(
            ApiError::from(StoreError::TaskNotFound(3)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StoreError::InvalidTaskStatus("x".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::UserDoesNotExist(9)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(StoreError::Internal("boom".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn infrastructure_details_are_not_exposed() {
        let err = ApiError::from(StoreError::Timeout {
            context: "get tasks",
            timeout_ms: 3000,
        });
        assert_eq!(err.client_message(), "internal server error");
    }

    #[test]
    fn domain_messages_are_passed_through() {
        let err = ApiError::from(StoreError::UserDoesNotExist(42));
        assert_eq!(err.client_message(), "user does not exist: 42");
        assert_eq!(
            ApiError::from(StoreError::TaskNotFound(1)).client_message(),
            "task not found"
        );
    }
}
