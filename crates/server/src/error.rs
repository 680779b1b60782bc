//! API error types.
//!
//! Bodies carry a generic message: a denied request learns only that it
//! was forbidden, and storage failures never leak backend details.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use reelgate_storage::StorageError;
use serde::Serialize;

use crate::headers::ALLOWED_METHODS;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("object not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden")]
    Forbidden,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("range not satisfiable for object of {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            // Keys that fail validation are indistinguishable from missing ones.
            StorageError::NotFound(_) | StorageError::InvalidKey(_) => Self::NotFound,
            StorageError::RangeNotSatisfiable { size } => Self::RangeNotSatisfiable { size },
            other => Self::Storage(other),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden => "forbidden",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Self::Internal(_) | Self::Storage(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Internal(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::RangeNotSatisfiable { .. } => "requested range not satisfiable".to_string(),
            Self::Internal(_) | Self::Storage(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        let mut response = (status, Json(body)).into_response();

        match self {
            Self::MethodNotAllowed => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
            }
            Self::RangeNotSatisfiable { size } => {
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                    response.headers_mut().insert(header::CONTENT_RANGE, value);
                }
            }
            _ => {}
        }

        response
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_client_statuses() {
        let not_found: ApiError = StorageError::NotFound("a.mp4".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let traversal: ApiError = StorageError::InvalidKey("../etc/passwd".into()).into();
        assert_eq!(traversal.status_code(), StatusCode::NOT_FOUND);

        let range: ApiError = StorageError::RangeNotSatisfiable { size: 10 }.into();
        assert_eq!(range.status_code(), StatusCode::RANGE_NOT_SATISFIABLE);

        let io: ApiError = StorageError::Io(std::io::Error::other("disk on fire")).into();
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(io.code(), "internal_error");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err: ApiError = StorageError::Io(std::io::Error::other("/srv/secret/path")).into();
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn unsatisfiable_range_carries_object_size() {
        let response = ApiError::RangeNotSatisfiable { size: 1000 }.into_response();
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.headers().get(header::CONTENT_RANGE).unwrap(),
            "bytes */1000"
        );
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let response = ApiError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            "GET, HEAD, OPTIONS"
        );
    }
}
