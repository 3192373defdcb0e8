//! Weather adapter backed by the Gyeonggi AWS hourly observation API
//!
//! Derived figures: NOAA heat index at or above 27℃ and the KMA wind-chill
//! formula at or below 10℃.

use super::http;
use super::{nearest, ProviderAdapter, TtlCache};
use crate::core::ProviderError;
use crate::layers::{DataSource, LayerPayload, WeatherObservation};
use crate::places::CanonicalLocation;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const PROVIDER: &str = "gg_aws";
const CREDENTIAL_HINT: &str = "GG_AWS_API_KEY";
const DATASET: &str = "AWS1hourObser";
const RESULT_OK: &str = "INFO-000";

/// One station's parsed observation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Station {
    sigun: String,
    name: String,
    observed_at: String,
    lat: f64,
    lon: f64,
    temperature: f64,
    humidity: f64,
    wind_speed: f64,
    wind_direction: f64,
}

impl Station {
    fn coords(&self) -> Option<(f64, f64)> {
        (self.lat != 0.0 && self.lon != 0.0).then_some((self.lat, self.lon))
    }
}

pub struct WeatherAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    stations: TtlCache<&'static str, Arc<Vec<Station>>>,
}

impl WeatherAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            stations: TtlCache::new(ttl),
        }
    }

    async fn all_stations(&self) -> Result<Arc<Vec<Station>>, ProviderError> {
        if let Some(stations) = self.stations.get(&DATASET) {
            tracing::debug!("AWS observation cache hit ({} stations)", stations.len());
            return Ok(stations);
        }

        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                hint: CREDENTIAL_HINT,
            })?;

        let request = self
            .client
            .get(format!("{}/{}", self.base_url, DATASET))
            .query(&[("KEY", key), ("Type", "json"), ("pIndex", "1"), ("pSize", "500")]);
        let body = http::send(PROVIDER, request).await?;
        let stations = Arc::new(parse_observations(&body.text)?);

        self.stations.insert(DATASET, stations.clone());
        Ok(stations)
    }
}

#[async_trait]
impl ProviderAdapter for WeatherAdapter {
    fn source(&self) -> DataSource {
        DataSource::Weather
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
        let stations = self.all_stations().await?;
        let (station, coords, distance_km) = nearest(&stations, location.coords(), Station::coords)
            .ok_or_else(|| ProviderError::NoMatchingRecord {
                provider: PROVIDER,
                query: location.display_name.clone(),
            })?;

        Ok(LayerPayload::Weather(WeatherObservation {
            station_name: station.name.clone(),
            sigun_name: station.sigun.clone(),
            observed_at: station.observed_at.clone(),
            lat: coords.0,
            lon: coords.1,
            distance_km,
            temperature: station.temperature,
            humidity: station.humidity,
            wind_speed: station.wind_speed,
            wind_direction: station.wind_direction,
            heat_index: heat_index(station.temperature, station.humidity),
            wind_chill: wind_chill(station.temperature, station.wind_speed),
        }))
    }
}

fn malformed(detail: impl Into<String>) -> ProviderError {
    ProviderError::MalformedResponse {
        provider: PROVIDER,
        detail: detail.into(),
    }
}

/// Parse the `{"AWS1hourObser": [{"head": [...]}, {"row": [...]}]}` document
fn parse_observations(text: &str) -> Result<Vec<Station>, ProviderError> {
    // The API answers with an XML error page when the key is rejected
    if !text.trim_start().starts_with('{') {
        return Err(malformed("response is not JSON"));
    }
    let doc: Value = http::parse_json(PROVIDER, text)?;
    let sections = doc[DATASET]
        .as_array()
        .ok_or_else(|| match doc["RESULT"]["CODE"].as_str() {
            Some(code) => ProviderError::Unavailable {
                provider: PROVIDER,
                message: format!(
                    "{}: {}",
                    code,
                    doc["RESULT"]["MESSAGE"].as_str().unwrap_or_default()
                ),
            },
            None => malformed(format!("missing {} section", DATASET)),
        })?;

    let head = sections.iter().find_map(|s| s["head"].as_array());
    if let Some(result) = head.and_then(|h| h.iter().find_map(|e| e.get("RESULT"))) {
        let code = result["CODE"].as_str().unwrap_or_default();
        if code != RESULT_OK {
            return Err(ProviderError::Unavailable {
                provider: PROVIDER,
                message: format!("{}: {}", code, result["MESSAGE"].as_str().unwrap_or_default()),
            });
        }
    }

    let rows = sections
        .iter()
        .find_map(|s| s["row"].as_array())
        .map(|rows| rows.iter().map(parse_row).collect())
        .unwrap_or_default();
    Ok(rows)
}

fn parse_row(row: &Value) -> Station {
    let text = |field: &str| http::lenient_string(&row[field]).unwrap_or_default();
    let number = |field: &str| http::lenient_f64(&row[field]).unwrap_or(0.0);

    let date = text("MESURE_DE");
    let hour = format!("{:0>2}", text("MESURE_TM"));
    let observed_at = if date.len() == 8 && date.is_ascii() {
        format!("{}-{}-{}T{}:00:00+09:00", &date[0..4], &date[4..6], &date[6..8], hour)
    } else {
        String::new()
    };

    Station {
        sigun: text("SIGUN_NM"),
        name: text("SPOT_NM"),
        observed_at,
        lat: number("WGS84_LAT"),
        lon: number("WGS84_LOGT"),
        temperature: number("TP_INFO"),
        humidity: number("HD_INFO"),
        wind_speed: number("WS_INFO"),
        wind_direction: number("WD_INFO"),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// NOAA Rothfusz regression, in ℃; `None` below 27℃
pub fn heat_index(temp_c: f64, rh: f64) -> Option<f64> {
    if temp_c < 27.0 {
        return None;
    }
    let tf = temp_c * 9.0 / 5.0 + 32.0;

    let mut hi = -42.379 + 2.04901523 * tf + 10.14333127 * rh
        - 0.22475541 * tf * rh
        - 0.00683783 * tf * tf
        - 0.05481717 * rh * rh
        + 0.00122874 * tf * tf * rh
        + 0.00085282 * tf * rh * rh
        - 0.00000199 * tf * tf * rh * rh;

    if rh < 13.0 && (80.0..=112.0).contains(&tf) {
        hi -= ((13.0 - rh) / 4.0) * ((17.0 - (tf - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&tf) {
        hi += ((rh - 85.0) / 10.0) * ((87.0 - tf) / 5.0);
    }

    Some(round1((hi - 32.0) * 5.0 / 9.0))
}

/// KMA wind-chill, in ℃; `None` above 10℃
///
/// Below 4.8 km/h of wind the air temperature is returned unchanged.
pub fn wind_chill(temp_c: f64, wind_ms: f64) -> Option<f64> {
    if temp_c > 10.0 {
        return None;
    }
    let v = wind_ms * 3.6;
    if v < 4.8 {
        return Some(temp_c);
    }
    let vp = v.powf(0.16);
    Some(round1(13.12 + 0.6215 * temp_c - 11.37 * vp + 0.3965 * temp_c * vp))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"AWS1hourObser": [
        {"head": [{"list_total_count": 2}, {"RESULT": {"CODE": "INFO-000", "MESSAGE": "정상 처리되었습니다."}}, {"api_version": "1.0"}]},
        {"row": [
            {"SIGUN_NM": "수원시", "SIGUN_CD": "41110", "SPOT_NO": "119", "SPOT_NM": "수원",
             "MESURE_DE": "20240801", "MESURE_TM": "9", "WGS84_LAT": "37.2723", "WGS84_LOGT": "126.9853",
             "TP_INFO": "32.4", "HD_INFO": "70", "WD_INFO": "180", "WS_INFO": "1.2"},
            {"SIGUN_NM": "가평군", "SPOT_NO": "999", "SPOT_NM": "좌표없음",
             "MESURE_DE": "20240801", "MESURE_TM": "09", "WGS84_LAT": "", "WGS84_LOGT": "",
             "TP_INFO": "30", "HD_INFO": "60", "WD_INFO": "0", "WS_INFO": "0"}
        ]}
    ]}"#;

    #[test]
    fn test_parse_observations() {
        let stations = parse_observations(SAMPLE).unwrap();
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].observed_at, "2024-08-01T09:00:00+09:00");
        assert_eq!(stations[0].temperature, 32.4);
        assert_eq!(stations[1].coords(), None);
    }

    #[test]
    fn test_non_json_body_is_malformed() {
        let err = parse_observations("<?xml version=\"1.0\"?><RESULT/>").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }

    #[test]
    fn test_error_result_code() {
        let text = r#"{"RESULT": {"CODE": "ERROR-290", "MESSAGE": "인증키가 유효하지 않습니다."}}"#;
        let err = parse_observations(text).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));

        let text = r#"{"AWS1hourObser": [{"head": [{"list_total_count": 0}, {"RESULT": {"CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다."}}]}]}"#;
        let err = parse_observations(text).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }

    #[test]
    fn test_heat_index() {
        assert_eq!(heat_index(26.9, 80.0), None);
        // 32℃ at 70% feels around 41℃
        let hi = heat_index(32.0, 70.0).unwrap();
        assert!((39.0..=43.0).contains(&hi), "{}", hi);
        // one decimal place
        assert_eq!(hi, (hi * 10.0).round() / 10.0);
    }

    #[test]
    fn test_wind_chill() {
        assert_eq!(wind_chill(10.5, 5.0), None);
        // calm wind: air temperature
        assert_eq!(wind_chill(-3.0, 1.0), Some(-3.0));
        let wc = wind_chill(-5.0, 5.0).unwrap();
        assert!(wc < -5.0 && wc > -15.0, "{}", wc);
    }
}
