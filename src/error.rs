//! Domain-specific error types for analyst-relay

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

/// Main error type for the relay pipeline
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Missing input: {field}")]
    MissingInput { field: String },

    #[error("Completion provider error: {message}")]
    Provider { message: String },

    #[error("Malformed JSON in provider response: {message}")]
    MalformedJson { message: String, raw: String },

    #[error("Invalid response structure from AI: key '{key}' missing or not {expected}")]
    ShapeMismatch {
        key: String,
        expected: &'static str,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RelayError {
    /// HTTP status the error maps to at the route boundary
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingInput { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body returned to the caller, including diagnostic detail
    /// (parse error, raw provider text) where it exists.
    pub fn body(&self) -> Value {
        match self {
            RelayError::MissingInput { field } => json!({
                "error": format!("{} is required", field),
            }),
            RelayError::Provider { message } => json!({
                "error": message,
            }),
            RelayError::MalformedJson { message, raw } => json!({
                "error": "Failed to parse AI response",
                "details": message,
                "rawResponse": raw,
            }),
            RelayError::ShapeMismatch { key, expected } => json!({
                "error": "Invalid response structure from AI",
                "details": format!("key '{}' missing or not {}", key, expected),
            }),
            RelayError::Config { message } | RelayError::Internal { message } => json!({
                "error": message,
            }),
        }
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(err: anyhow::Error) -> Self {
        RelayError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Internal {
            message: format!("Serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Provider {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

/// Convert RelayError into a JSON HTTP response at the route boundary
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "application/json")],
            self.body().to_string(),
        )
            .into_response()
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
