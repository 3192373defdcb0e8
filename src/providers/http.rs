//! HTTP plumbing shared by the adapters

use crate::core::ProviderError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// A successful response body with its content type
pub(crate) struct Body {
    pub content_type: String,
    pub text: String,
}

pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

/// Send a request and return the body, mapping transport and status errors
pub(crate) async fn send(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Body, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Network { provider, source })?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let text = response
        .text()
        .await
        .map_err(|source| ProviderError::Network { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::from_status(provider, status, &text));
    }

    Ok(Body { content_type, text })
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &'static str,
    text: &str,
) -> Result<T, ProviderError> {
    serde_json::from_str(text).map_err(|e| ProviderError::MalformedResponse {
        provider,
        detail: e.to_string(),
    })
}

/// Read a number that upstream may send as a JSON number or a string
///
/// Placeholders such as `"-"` or `""` read as `None`.
pub(crate) fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_f64() {
        assert_eq!(lenient_f64(&json!(12.5)), Some(12.5));
        assert_eq!(lenient_f64(&json!("31")), Some(31.0));
        assert_eq!(lenient_f64(&json!("-")), None);
        assert_eq!(lenient_f64(&json!(null)), None);
    }

    #[test]
    fn test_parse_json_malformed() {
        let err = parse_json::<Value>("sgis", "<html>").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
