//! Worker error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use squash_models::Envelope;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors rendered as the JSON envelope.
///
/// Every variant carries a stable machine-readable code; internal
/// variants never expose infrastructure error text to callers.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{message}")]
    BadRequest {
        message: String,
        code: String,
        details: Option<serde_json::Value>,
    },

    #[error("{message}")]
    Internal { message: String, code: String },
}

impl WorkerError {
    pub fn bad_request(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn bad_request_with(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<serde_json::Value>,
    ) -> Self {
        Self::BadRequest {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn internal(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            code: code.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WorkerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            WorkerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, code, details) = match self {
            WorkerError::BadRequest {
                message,
                code,
                details,
            } => (message, code, details),
            WorkerError::Internal { message, code } => (message, code, None),
        };

        let body: Envelope = Envelope::error(status.as_u16(), message, code, details);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_renders_envelope() {
        let err = WorkerError::bad_request_with(
            "missing required fields",
            "missing_fields",
            "url and container are required",
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_has_no_details() {
        let err = WorkerError::internal("could not start compression", "internal_error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            WorkerError::Internal { .. } => {}
            _ => panic!("expected Internal"),
        }
    }
}
