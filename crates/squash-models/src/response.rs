//! JSON response envelope for the worker's command surface.
//!
//! Every response carries `success`, the HTTP status, a timestamp and a
//! human-readable message; failures add a machine-readable code plus
//! optional details. Internal error text from infrastructure never goes
//! into `details`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code (e.g. "missing_fields")
    pub error: String,
    /// Optional free-form details safe to show callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Response envelope shared by all worker endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = serde_json::Value> {
    pub success: bool,
    pub status: u16,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    /// Success envelope with an optional payload.
    pub fn success(status: u16, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            status,
            timestamp: Utc::now(),
            message: message.into(),
            data,
            error: None,
        }
    }

    /// Error envelope with a machine-readable code.
    pub fn error(
        status: u16,
        message: impl Into<String>,
        code: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            status,
            timestamp: Utc::now(),
            message: message.into(),
            data: None,
            error: Some(ErrorBody {
                error: code.into(),
                details,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_error() {
        let env: Envelope<serde_json::Value> =
            Envelope::success(201, "file download started", None);
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["status"], 201);
        assert!(json.get("error").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_error_envelope_carries_code() {
        let env: Envelope = Envelope::error(
            400,
            "missing required fields",
            "missing_fields",
            Some(serde_json::json!("url and container are required")),
        );
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["error"], "missing_fields");
        assert_eq!(json["error"]["details"], "url and container are required");
    }
}
