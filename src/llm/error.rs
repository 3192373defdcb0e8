//! Typed errors for agent gateway calls
//!
//! Every variant surfaces to the session as an agent gateway failure; the
//! variants exist so logs say what actually went wrong.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key configured for the gateway
    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),

    /// API key rejected (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Quota exceeded (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Request rejected as malformed (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side failure (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Connection refused, DNS, transport timeout
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway answered but the body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            429 => LlmError::RateLimited(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            other => LlmError::InvalidResponse(format!("HTTP {}: {}", other, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            Self::from_http_status(status, e.to_string())
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}
