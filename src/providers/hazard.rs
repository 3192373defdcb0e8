//! Flood-trace adapter (hazard geometry, WFS layer `spggcee:tm_fldn_trce`)
//!
//! The flood-trace layer carries no district column, so the sample is
//! province-wide and cached once per TTL.

use super::http::{lenient_f64, lenient_string};
use super::wfs::{self, FeatureCollection};
use super::{ProviderAdapter, TtlCache};
use crate::core::ProviderError;
use crate::layers::{DataSource, FloodTrace, HazardSummary, LayerPayload};
use crate::places::CanonicalLocation;
use async_trait::async_trait;
use std::time::Duration;

const PROVIDER: &str = "climate_wfs_flood";
const CREDENTIAL_HINT: &str = "GG_CLIMATE_API_KEY";
const TYPE_NAME: &str = "spggcee:tm_fldn_trce";
const MAX_SAMPLES: &str = "5";
const REGION: &str = "경기";

pub struct HazardAdapter {
    client: reqwest::Client,
    wfs_url: String,
    api_key: Option<String>,
    samples: TtlCache<&'static str, HazardSummary>,
}

impl HazardAdapter {
    pub fn new(
        client: reqwest::Client,
        wfs_url: &str,
        api_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            wfs_url: wfs_url.to_string(),
            api_key,
            samples: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl ProviderAdapter for HazardAdapter {
    fn source(&self) -> DataSource {
        DataSource::HazardGeometry
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn credential_hint(&self) -> &'static str {
        CREDENTIAL_HINT
    }

    async fn fetch(&self, location: &CanonicalLocation) -> Result<LayerPayload, ProviderError> {
        if let Some(summary) = self.samples.get(&REGION) {
            return Ok(LayerPayload::Hazard(summary));
        }

        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                hint: CREDENTIAL_HINT,
            })?;

        let request = self.client.get(&self.wfs_url).query(&[
            ("apiKey", key),
            ("service", "WFS"),
            ("version", "1.0.0"),
            ("request", "GetFeature"),
            ("typeName", TYPE_NAME),
            ("outputFormat", "application/json"),
            ("maxFeatures", MAX_SAMPLES),
        ]);
        let collection = wfs::get_features(PROVIDER, request).await?;
        let summary = summarize(&collection).ok_or_else(|| ProviderError::NoMatchingRecord {
            provider: PROVIDER,
            query: location.display_name.clone(),
        })?;

        self.samples.insert(REGION, summary.clone());
        Ok(LayerPayload::Hazard(summary))
    }
}

fn summarize(collection: &FeatureCollection) -> Option<HazardSummary> {
    if collection.features.is_empty() {
        return None;
    }
    let samples = collection
        .features
        .iter()
        .map(|f| FloodTrace {
            depth_m: lenient_f64(&f.properties["fldn_dowa"]),
            grade: lenient_string(&f.properties["fldn_grd"]),
            disaster_name: lenient_string(&f.properties["fldn_dstr_nm"]),
        })
        .collect();

    Some(HazardSummary {
        total_features: collection.total(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_samples() {
        let fc = wfs::parse_feature_collection(
            PROVIDER,
            "application/json",
            r#"{"totalFeatures": 4821, "features": [
                {"properties": {"fldn_dowa": "0.5", "fldn_grd": "2", "fldn_dstr_nm": "태풍 카눈"}},
                {"properties": {"fldn_dowa": 1.2, "fldn_dstr_nm": "집중호우"}}
            ]}"#,
        )
        .unwrap();
        let summary = summarize(&fc).unwrap();
        assert_eq!(summary.total_features, 4821);
        assert_eq!(summary.samples.len(), 2);
        assert_eq!(summary.samples[0].depth_m, Some(0.5));
        assert_eq!(summary.samples[0].grade.as_deref(), Some("2"));
        assert_eq!(summary.samples[1].grade, None);
        assert!(summary.summary().contains("총 4821개"));
    }

    #[test]
    fn test_empty_collection_has_no_summary() {
        let fc = wfs::parse_feature_collection(PROVIDER, "application/json", r#"{"features": []}"#)
            .unwrap();
        assert!(summarize(&fc).is_none());
    }
}
