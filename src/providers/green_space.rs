//! Vegetation coverage adapter (biotope map, WFS layer `spggcee:grbt`)

use super::http::{lenient_f64, lenient_string};
use super::wfs::{self, Feature};
use super::{ProviderAdapter, TtlCache};
use crate::core::ProviderError;
use crate::layers::{BiotopeClass, DataSource, GreenSpaceSummary, LayerPayload};
use crate::places::CanonicalLocation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

const PROVIDER: &str = "climate_wfs_grbt";
const CREDENTIAL_HINT: &str = "GG_CLIMATE_API_KEY";
const TYPE_NAME: &str = "spggcee:grbt";
const UNCLASSIFIED: &str = "미분류";
const TOP_CLASSES: usize = 5;

pub struct GreenSpaceAdapter {
    client: reqwest::Client,
    wfs_url: String,
    api_key: Option<String>,
    summaries: TtlCache<String, GreenSpaceSummary>,
}

impl GreenSpaceAdapter {
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
            summaries: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GreenSpaceAdapter {
    fn source(&self) -> DataSource {
        DataSource::Vegetation
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
        if let Some(summary) = self.summaries.get(&location.normalized_name) {
            return Ok(LayerPayload::GreenSpace(summary));
        }

        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                hint: CREDENTIAL_HINT,
            })?;

        let names = filter_names(&location.provider_keys.sgg_names);
        let request = self.client.get(&self.wfs_url).query(&[
            ("service", "WFS"),
            ("version", "2.0.0"),
            ("request", "GetFeature"),
            ("typeName", TYPE_NAME),
            ("outputFormat", "application/json"),
            ("srsname", "EPSG:4326"),
            ("count", "5000"),
            ("apiKey", key),
            ("CQL_FILTER", wfs::cql_like_any("sgg_nm", &names).as_str()),
        ]);
        let collection = wfs::get_features(PROVIDER, request).await?;

        if collection.features.is_empty() {
            return Err(ProviderError::NoMatchingRecord {
                provider: PROVIDER,
                query: location.display_name.clone(),
            });
        }

        let summary = aggregate(&collection.features, &location.provider_keys.sgg_names);
        tracing::debug!(
            "Aggregated {} biotope features for {}",
            summary.feature_count,
            location.display_name
        );
        self.summaries
            .insert(location.normalized_name.clone(), summary.clone());
        Ok(LayerPayload::GreenSpace(summary))
    }
}

/// District names as they appear in the LIKE filter, trailing 시 removed
fn filter_names(sgg_names: &[String]) -> Vec<String> {
    sgg_names
        .iter()
        .map(|n| n.strip_suffix('시').unwrap_or(n).to_string())
        .collect()
}

/// Sum `biotop_area` per four-level classification, largest first
fn aggregate(features: &[Feature], district_names: &[String]) -> GreenSpaceSummary {
    let mut total = 0.0;
    let mut by_class: HashMap<[String; 4], (f64, usize)> = HashMap::new();

    for feature in features {
        let props = &feature.properties;
        let area = lenient_f64(&props["biotop_area"]).unwrap_or(0.0);
        total += area;

        let level = |field: &str| {
            lenient_string(&props[field]).unwrap_or_else(|| UNCLASSIFIED.to_string())
        };
        let key = [
            level("lclsf_nm"),
            level("mclsf_nm"),
            level("sclsf_nm"),
            level("dclsf_nm"),
        ];
        let slot = by_class.entry(key).or_insert((0.0, 0));
        slot.0 += area;
        slot.1 += 1;
    }

    let mut classes: Vec<BiotopeClass> = by_class
        .into_iter()
        .map(|([_, _, _, detail], (area_m2, count))| BiotopeClass {
            name: detail,
            area_m2,
            count,
        })
        .collect();
    classes.sort_by(|a, b| b.area_m2.total_cmp(&a.area_m2).then_with(|| a.name.cmp(&b.name)));
    classes.truncate(TOP_CLASSES);

    GreenSpaceSummary {
        district_names: district_names.to_vec(),
        total_area_m2: total,
        feature_count: features.len(),
        top_classes: classes,
    }
}
