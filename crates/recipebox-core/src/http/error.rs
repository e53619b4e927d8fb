//! Error types for API access.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::storage::StorageError;

/// No response was obtained from the server.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Typed failure of a resource or session operation.
#[derive(Debug)]
pub enum ApiError {
    /// The server answered with a non-success status.
    Status {
        status: u16,
        /// Human-readable message extracted from the body, if any
        message: Option<String>,
    },
    /// No response was received.
    Fetch(FetchError),
    /// The response (or request) body was not the expected JSON.
    Json(serde_json::Error),
    /// Local state could not be persisted.
    Storage(StorageError),
    /// Rejected client-side before any request was issued.
    Invalid(String),
}

impl ApiError {
    /// Builds a status error from a response body.
    pub fn status(status: u16, body: &[u8]) -> Self {
        ApiError::Status {
            status,
            message: extract_message(body),
        }
    }

    /// Returns the HTTP status, if the server answered.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 401 that survived the refresh attempt.
    pub fn is_unauthorized(&self) -> bool {
        self.http_status() == Some(401)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Status {
                status,
                message: Some(message),
            } => write!(f, "HTTP {status}: {message}"),
            ApiError::Status {
                status,
                message: None,
            } => write!(f, "HTTP {status}"),
            ApiError::Fetch(err) => write!(f, "{err}"),
            ApiError::Json(_) => write!(f, "unexpected response payload"),
            ApiError::Storage(err) => write!(f, "{err}"),
            ApiError::Invalid(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Fetch(err) => Some(err),
            ApiError::Json(err) => Some(err),
            ApiError::Storage(err) => Some(err),
            ApiError::Status { .. } | ApiError::Invalid(_) => None,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        ApiError::Fetch(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Json(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

/// Longest raw body echoed back as an error message.
const MAX_RAW_MESSAGE_CHARS: usize = 200;

/// Pulls a message out of an error body: JSON `message`, then `error`
/// (string or `{message}` object), then the raw text.
pub(crate) fn extract_message(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(text) {
        let message = json
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| json.get("error").and_then(Value::as_str))
            .or_else(|| {
                json.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::trim)
            .filter(|m| !m.is_empty());
        return message.map(str::to_string);
    }

    Some(text.chars().take(MAX_RAW_MESSAGE_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_wins() {
        let body = br#"{"message":"Recipe not found","error":"Not Found"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("Recipe not found"));
    }

    #[test]
    fn test_error_field_string_and_object() {
        assert_eq!(
            extract_message(br#"{"error":"Username already exists!"}"#).as_deref(),
            Some("Username already exists!")
        );
        assert_eq!(
            extract_message(br#"{"error":{"message":"nested"}}"#).as_deref(),
            Some("nested")
        );
    }

    #[test]
    fn test_plain_text_and_empty_bodies() {
        assert_eq!(extract_message(b"Logged out").as_deref(), Some("Logged out"));
        assert_eq!(extract_message(b"   "), None);
        assert_eq!(extract_message(br#"{"accessToken":null}"#), None);
    }

    #[test]
    fn test_status_display() {
        let err = ApiError::status(400, br#"{"error":"Username already exists!"}"#);
        assert_eq!(err.to_string(), "HTTP 400: Username already exists!");
        assert_eq!(err.http_status(), Some(400));
        assert!(!err.is_unauthorized());

        let err = ApiError::status(401, b"");
        assert_eq!(err.to_string(), "HTTP 401");
        assert!(err.is_unauthorized());
    }
}
