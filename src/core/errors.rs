//! Domain error types
//!
//! These errors represent business logic failures, distinct from infrastructure errors.
//! Every error maps onto one [`ErrorCategory`] so that logs and user-facing
//! handling agree on a single taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Error taxonomy shared by logging and request handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A provider or the agent gateway has no credentials configured
    CredentialsMissing,
    /// A place name could not be mapped to a canonical location
    LocationUnresolved,
    /// Upstream returned a non-success status or could not be reached
    ProviderUnavailable,
    /// Upstream answered successfully but had no record for the location
    ProviderNoData,
    /// Upstream body was not JSON or did not match the expected schema
    ProviderMalformedResponse,
    /// An agent round-trip did not finish in time
    AgentTimeout,
    /// The agent gateway failed
    AgentGatewayFailure,
    /// A newer request replaced this one
    RequestSuperseded,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::CredentialsMissing => "credentials_missing",
            ErrorCategory::LocationUnresolved => "location_unresolved",
            ErrorCategory::ProviderUnavailable => "provider_unavailable",
            ErrorCategory::ProviderNoData => "provider_no_data",
            ErrorCategory::ProviderMalformedResponse => "provider_malformed_response",
            ErrorCategory::AgentTimeout => "agent_timeout",
            ErrorCategory::AgentGatewayFailure => "agent_gateway_failure",
            ErrorCategory::RequestSuperseded => "request_superseded",
        }
    }

    /// Whether the user should ever see this category
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ErrorCategory::RequestSuperseded)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a data provider adapter
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The adapter has no API key / consumer secret configured
    #[error("{provider}: credentials missing ({hint})")]
    CredentialsMissing {
        provider: &'static str,
        hint: &'static str,
    },

    /// Non-success HTTP status or upstream error code
    #[error("{provider}: upstream unavailable: {message}")]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    /// Upstream had no record for the requested location
    #[error("{provider}: no matching record for '{query}'")]
    NoMatchingRecord {
        provider: &'static str,
        query: String,
    },

    /// Body was not JSON, or JSON did not have the expected shape
    #[error("{provider}: malformed response: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    /// Connection failure, DNS, client-side timeout
    #[error("{provider}: network error: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ProviderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::CredentialsMissing { .. } => ErrorCategory::CredentialsMissing,
            ProviderError::Unavailable { .. } | ProviderError::Network { .. } => {
                ErrorCategory::ProviderUnavailable
            }
            ProviderError::NoMatchingRecord { .. } => ErrorCategory::ProviderNoData,
            ProviderError::MalformedResponse { .. } => ErrorCategory::ProviderMalformedResponse,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            ProviderError::CredentialsMissing { provider, .. }
            | ProviderError::Unavailable { provider, .. }
            | ProviderError::NoMatchingRecord { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::Network { provider, .. } => provider,
        }
    }

    /// Map a non-success HTTP status into `Unavailable`
    pub fn from_status(
        provider: &'static str,
        status: reqwest::StatusCode,
        body: &str,
    ) -> Self {
        let preview: String = body.chars().take(200).collect();
        ProviderError::Unavailable {
            provider,
            message: format!("HTTP {}: {}", status, preview),
        }
    }
}

/// A place name that is not in the location table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown place: '{0}' (only Gyeonggi-do cities and districts are supported)")]
pub struct PlaceNotFound(pub String);

impl PlaceNotFound {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::LocationUnresolved
    }
}

/// Errors that end a user request
#[derive(Debug, Error)]
pub enum RequestError {
    /// An agent round-trip exceeded its time budget
    #[error("Agent did not respond within {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// The agent gateway returned an error
    #[error("Agent gateway failure: {0:#}")]
    Gateway(#[source] anyhow::Error),

    /// A newer submission replaced this request
    #[error("Request superseded by a newer submission")]
    Superseded,
}

impl RequestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RequestError::Timeout { .. } => ErrorCategory::AgentTimeout,
            RequestError::Gateway(_) => ErrorCategory::AgentGatewayFailure,
            RequestError::Superseded => ErrorCategory::RequestSuperseded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_categories() {
        let err = ProviderError::CredentialsMissing {
            provider: "sgis",
            hint: "SGIS_CONSUMER_KEY",
        };
        assert_eq!(err.category(), ErrorCategory::CredentialsMissing);

        let err = ProviderError::Unavailable {
            provider: "airkorea",
            message: "HTTP 503".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ProviderUnavailable);
        assert_eq!(err.provider(), "airkorea");

        let err = ProviderError::MalformedResponse {
            provider: "gg_aws",
            detail: "not JSON".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::ProviderMalformedResponse);
    }

    #[test]
    fn test_only_supersede_is_hidden() {
        assert!(!ErrorCategory::RequestSuperseded.is_user_visible());
        assert!(ErrorCategory::AgentTimeout.is_user_visible());
        assert!(ErrorCategory::AgentGatewayFailure.is_user_visible());
    }

    #[test]
    fn test_request_error_display() {
        let err = RequestError::Timeout {
            after: Duration::from_secs(15),
        };
        assert_eq!(err.to_string(), "Agent did not respond within 15s");
        assert_eq!(err.category(), ErrorCategory::AgentTimeout);
        assert_eq!(
            RequestError::Superseded.category(),
            ErrorCategory::RequestSuperseded
        );
    }

    #[test]
    fn test_from_status_truncates_body() {
        let body = "x".repeat(500);
        let err = ProviderError::from_status("wfs", reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            ProviderError::Unavailable { message, .. } => {
                assert!(message.starts_with("HTTP 502"));
                assert!(message.len() < 260);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
