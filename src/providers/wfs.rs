//! WFS GetFeature helpers for the Gyeonggi climate platform

use super::http;
use crate::core::ProviderError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(rename = "totalFeatures", default)]
    total_features: Value,
    #[serde(rename = "numberMatched", default)]
    number_matched: Value,
}

impl FeatureCollection {
    /// Server-side match count, falling back to the number returned
    pub fn total(&self) -> u64 {
        http::lenient_f64(&self.total_features)
            .or_else(|| http::lenient_f64(&self.number_matched))
            .map(|n| n as u64)
            .unwrap_or(self.features.len() as u64)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    #[serde(default)]
    pub properties: Value,
}

/// `column LIKE '%name%'` for each name, joined with OR
pub(crate) fn cql_like_any(column: &str, names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("{} LIKE '%{}%'", column, n.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Send a GetFeature request and parse the GeoJSON answer
pub(crate) async fn get_features(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<FeatureCollection, ProviderError> {
    let body = http::send(provider, request).await?;
    parse_feature_collection(provider, &body.content_type, &body.text)
}

/// GeoServer reports unknown layers and bad filters as XML exception reports
pub(crate) fn parse_feature_collection(
    provider: &'static str,
    content_type: &str,
    text: &str,
) -> Result<FeatureCollection, ProviderError> {
    if content_type.contains("xml") || !text.trim_start().starts_with('{') {
        return Err(ProviderError::MalformedResponse {
            provider,
            detail: format!("expected GeoJSON, got '{}'", content_type),
        });
    }
    http::parse_json(provider, text)
}
