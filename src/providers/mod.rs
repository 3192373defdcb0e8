//! Data provider adapters
//!
//! One adapter per upstream data source. Each adapter owns its HTTP client,
//! its TTL cache and (where needed) its credential handshake, and turns a
//! [`CanonicalLocation`] into a typed [`LayerPayload`].

pub mod airkorea;
pub mod cache;
pub mod green_space;
pub mod hazard;
pub(crate) mod http;
pub mod sgis;
pub mod token;
pub mod weather;
pub(crate) mod wfs;

pub use airkorea::AirKoreaAdapter;
pub use cache::TtlCache;
pub use green_space::GreenSpaceAdapter;
pub use hazard::HazardAdapter;
pub use sgis::SgisAdapter;
pub use token::TokenCache;
pub use weather::WeatherAdapter;

use crate::config::{Credentials, ProvidersConfig};
use crate::core::ProviderError;
use crate::layers::{DataSource, LayerPayload};
use crate::places::{haversine_km, CanonicalLocation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// A single upstream data source
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which data source this adapter serves
    fn source(&self) -> DataSource;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Whether the credentials this adapter needs are configured
    fn has_credentials(&self) -> bool;

    /// Environment variable(s) that supply the credentials
    fn credential_hint(&self) -> &'static str;

    /// Fetch the payload for a location
    async fn fetch(&self, location: &CanonicalLocation) -> Result<LayerPayload, ProviderError>;
}

/// The adapters available to a session, indexed by data source
#[derive(Clone, Default)]
pub struct ProviderSet {
    adapters: HashMap<DataSource, Arc<dyn ProviderAdapter>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same source
    pub fn with(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.source(), adapter);
        self
    }

    /// The production adapters, wired from config and environment credentials
    pub fn from_config(config: &ProvidersConfig, credentials: &Credentials) -> Self {
        let client = http::client(config.request_timeout());
        let ttl = config.cache_ttl();

        Self::new()
            .with(Arc::new(SgisAdapter::new(
                client.clone(),
                &config.sgis_base_url,
                credentials.sgis_consumer_key.clone(),
                credentials.sgis_consumer_secret.clone(),
            )))
            .with(Arc::new(AirKoreaAdapter::new(
                client.clone(),
                &config.airkorea_base_url,
                credentials.airkorea_service_key.clone(),
                ttl,
            )))
            .with(Arc::new(WeatherAdapter::new(
                client.clone(),
                &config.gg_aws_base_url,
                credentials.gg_aws_api_key.clone(),
                ttl,
            )))
            .with(Arc::new(GreenSpaceAdapter::new(
                client.clone(),
                &config.climate_wfs_url,
                credentials.gg_climate_api_key.clone(),
                ttl,
            )))
            .with(Arc::new(HazardAdapter::new(
                client,
                &config.climate_wfs_url,
                credentials.gg_climate_api_key.clone(),
                ttl,
            )))
    }

    pub fn get(&self, source: DataSource) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&source).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// One warning line per adapter that lacks credentials
    pub fn credential_warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .adapters
            .values()
            .filter(|a| !a.has_credentials())
            .map(|a| {
                format!(
                    "{} data unavailable: set {}",
                    a.name(),
                    a.credential_hint()
                )
            })
            .collect();
        warnings.sort();
        warnings
    }
}

/// Pick the item closest to `origin` among those with known coordinates
///
/// Returns the item, its own coordinates, and the distance in km.
pub(crate) fn nearest<T>(
    items: &[T],
    origin: (f64, f64),
    coords: impl Fn(&T) -> Option<(f64, f64)>,
) -> Option<(&T, (f64, f64), f64)> {
    items
        .iter()
        .filter_map(|item| coords(item).map(|c| (item, c, haversine_km(origin, c))))
        .min_by(|a, b| a.2.total_cmp(&b.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoKeyAdapter;

    #[async_trait]
    impl ProviderAdapter for NoKeyAdapter {
        fn source(&self) -> DataSource {
            DataSource::Weather
        }
        fn name(&self) -> &'static str {
            "gg_aws"
        }
        fn has_credentials(&self) -> bool {
            false
        }
        fn credential_hint(&self) -> &'static str {
            "GG_AWS_API_KEY"
        }
        async fn fetch(&self, _: &CanonicalLocation) -> Result<LayerPayload, ProviderError> {
            Err(ProviderError::CredentialsMissing {
                provider: "gg_aws",
                hint: "GG_AWS_API_KEY",
            })
        }
    }

    #[test]
    fn test_credential_warnings() {
        let set = ProviderSet::new().with(Arc::new(NoKeyAdapter));
        let warnings = set.credential_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("GG_AWS_API_KEY"));
        assert!(set.get(DataSource::Weather).is_some());
        assert!(set.get(DataSource::Demographic).is_none());
    }

    #[test]
    fn test_production_set_covers_every_source() {
        let set = ProviderSet::from_config(&ProvidersConfig::default(), &Credentials::default());
        assert_eq!(set.len(), 5);
        assert_eq!(set.credential_warnings().len(), 5);
    }

    #[test]
    fn test_nearest_skips_unknown_coordinates() {
        let items = vec![("far", Some((38.0, 127.0))), ("none", None), ("near", Some((37.27, 127.03)))];
        let (item, coords, dist) = nearest(&items, (37.2636, 127.0286), |i| i.1).unwrap();
        assert_eq!(item.0, "near");
        assert_eq!(coords, (37.27, 127.03));
        assert!(dist < 2.0);

        let empty: Vec<(&str, Option<(f64, f64)>)> = vec![("none", None)];
        assert!(nearest(&empty, (37.0, 127.0), |i| i.1).is_none());
    }
}
