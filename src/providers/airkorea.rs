//! Air-quality adapter backed by the AirKorea realtime measurement API
//!
//! The whole Gyeonggi station list is fetched in one call and cached. The
//! realtime endpoint does not carry coordinates, so station positions are
//! inferred from place keywords in the station name.

use super::http;
use super::{nearest, ProviderAdapter, TtlCache};
use crate::core::ProviderError;
use crate::layers::{AirQualityReading, DataSource, LayerPayload};
use crate::places::CanonicalLocation;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const PROVIDER: &str = "airkorea";
const CREDENTIAL_HINT: &str = "AIRKOREA_SERVICE_KEY";
const SIDO_NAME: &str = "경기";

/// Station-name keyword → approximate coordinates
const STATION_KEYWORDS: &[(&str, f64, f64)] = &[
    ("수원", 37.2636, 127.0286),
    ("성남", 37.4201, 127.1265),
    ("분당", 37.3838, 127.1192),
    ("용인", 37.2411, 127.1776),
    ("안양", 37.3943, 126.9568),
    ("부천", 37.5034, 126.7660),
    ("광명", 37.4786, 126.8644),
    ("평택", 36.9921, 127.0857),
    ("안산", 37.3219, 126.8309),
    ("고양", 37.6583, 126.8320),
    ("일산", 37.6755, 126.7706),
    ("과천", 37.4292, 126.9876),
    ("구리", 37.5943, 127.1295),
    ("남양주", 37.6360, 127.2165),
    ("오산", 37.1498, 127.0772),
    ("시흥", 37.3800, 126.8028),
    ("군포", 37.3616, 126.9352),
    ("의왕", 37.3447, 126.9685),
    ("하남", 37.5392, 127.2147),
    ("파주", 37.7126, 126.7610),
    ("이천", 37.2719, 127.4348),
    ("안성", 37.0078, 127.2797),
    ("김포", 37.6153, 126.7156),
    ("화성", 37.1995, 126.8313),
    ("동탄", 37.2007, 127.0714),
    ("광주", 37.4095, 127.2550),
    ("양주", 37.7854, 127.0456),
    ("포천", 37.8949, 127.2003),
    ("여주", 37.2984, 127.6374),
    ("의정부", 37.7381, 127.0337),
    ("영통", 37.2479, 127.0735),
    ("권선", 37.2504, 127.0030),
    ("장안", 37.3035, 127.0106),
    ("팔달", 37.2795, 127.0392),
    ("중원", 37.4344, 127.1365),
    ("수정", 37.4530, 127.1455),
    ("판교", 37.3947, 127.1112),
];

#[derive(Debug, Deserialize)]
struct Envelope {
    response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    header: Header,
    body: Option<Items>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(rename = "resultCode")]
    result_code: String,
    #[serde(rename = "resultMsg", default)]
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct Items {
    #[serde(default)]
    items: Vec<StationItem>,
}

/// One realtime row; AirKorea sends every figure as a string, "-" when missing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StationItem {
    station_name: String,
    data_time: Option<String>,
    khai_value: Option<String>,
    khai_grade: Option<String>,
    pm10_value: Option<String>,
    pm10_grade: Option<String>,
    pm25_value: Option<String>,
    pm25_grade: Option<String>,
    so2_value: Option<String>,
    co_value: Option<String>,
    o3_value: Option<String>,
    no2_value: Option<String>,
}

pub struct AirKoreaAdapter {
    client: reqwest::Client,
    base_url: String,
    service_key: Option<String>,
    stations: TtlCache<&'static str, Arc<Vec<StationItem>>>,
}

impl AirKoreaAdapter {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        service_key: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            stations: TtlCache::new(ttl),
        }
    }

    async fn province_stations(&self) -> Result<Arc<Vec<StationItem>>, ProviderError> {
        if let Some(items) = self.stations.get(&SIDO_NAME) {
            tracing::debug!("AirKorea station list cache hit ({} stations)", items.len());
            return Ok(items);
        }

        let key = self
            .service_key
            .as_deref()
            .ok_or(ProviderError::CredentialsMissing {
                provider: PROVIDER,
                hint: CREDENTIAL_HINT,
            })?;

        let request = self
            .client
            .get(format!(
                "{}/ArpltnInforInqireSvc/getCtprvnRltmMesureDnsty",
                self.base_url
            ))
            .query(&[
                ("serviceKey", key),
                ("returnType", "json"),
                ("numOfRows", "200"),
                ("pageNo", "1"),
                ("sidoName", SIDO_NAME),
                ("ver", "1.0"),
            ]);
        let body = http::send(PROVIDER, request).await?;
        let items = Arc::new(parse_realtime(&body.text)?);

        tracing::debug!("Fetched {} AirKorea stations in {}", items.len(), SIDO_NAME);
        self.stations.insert(SIDO_NAME, items.clone());
        Ok(items)
    }
}

#[async_trait]
impl ProviderAdapter for AirKoreaAdapter {
    fn source(&self) -> DataSource {
        DataSource::AirQuality
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn has_credentials(&self) -> bool {
        self.service_key.is_some()
    }

    fn credential_hint(&self) -> &'static str {
        CREDENTIAL_HINT
    }

    async fn fetch(&self, location: &CanonicalLocation) -> Result<LayerPayload, ProviderError> {
        let stations = self.province_stations().await?;
        let reading = nearest_reading(&stations, location)?;
        Ok(LayerPayload::AirQuality(reading))
    }
}

fn parse_realtime(text: &str) -> Result<Vec<StationItem>, ProviderError> {
    let envelope: Envelope = http::parse_json(PROVIDER, text)?;
    let header = envelope.response.header;
    if header.result_code != "00" {
        return Err(ProviderError::Unavailable {
            provider: PROVIDER,
            message: format!("resultCode {}: {}", header.result_code, header.result_msg),
        });
    }
    Ok(envelope.response.body.map(|b| b.items).unwrap_or_default())
}

fn station_coordinates(station_name: &str) -> Option<(f64, f64)> {
    STATION_KEYWORDS
        .iter()
        .find(|(keyword, _, _)| station_name.contains(keyword))
        .map(|(_, lat, lon)| (*lat, *lon))
}

/// Reading from the station nearest to `location`
///
/// If no station name maps to known coordinates the first station stands in,
/// positioned at the location itself.
fn nearest_reading(
    stations: &[StationItem],
    location: &CanonicalLocation,
) -> Result<AirQualityReading, ProviderError> {
    let origin = location.coords();
    let (item, coords, distance_km) =
        match nearest(stations, origin, |s| station_coordinates(&s.station_name)) {
            Some(found) => found,
            None => {
                let first = stations.first().ok_or_else(|| ProviderError::NoMatchingRecord {
                    provider: PROVIDER,
                    query: location.display_name.clone(),
                })?;
                (first, origin, 0.0)
            }
        };

    Ok(AirQualityReading {
        station_name: item.station_name.clone(),
        measured_at: item.data_time.clone().unwrap_or_default(),
        lat: coords.0,
        lon: coords.1,
        distance_km,
        khai_value: parse_value(&item.khai_value),
        khai_grade: parse_grade(&item.khai_grade),
        pm10: parse_value(&item.pm10_value),
        pm10_grade: parse_grade(&item.pm10_grade),
        pm25: parse_value(&item.pm25_value),
        pm25_grade: parse_grade(&item.pm25_grade),
        o3: parse_value(&item.o3_value),
        no2: parse_value(&item.no2_value),
        co: parse_value(&item.co_value),
        so2: parse_value(&item.so2_value),
    })
}

/// Missing values and "-" read as 0
fn parse_value(raw: &Option<String>) -> f64 {
    raw.as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Grades outside 1..=4 default to 1 (good)
fn parse_grade(raw: &Option<String>) -> u8 {
    raw.as_deref()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|g| (1..=4).contains(g))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"response": {
        "header": {"resultCode": "00", "resultMsg": "NORMAL_CODE"},
        "body": {"totalCount": 3, "items": [
            {"stationName": "신풍동", "dataTime": "2024-07-01 14:00", "khaiValue": "55"},
            {"stationName": "인계동(수원)", "dataTime": "2024-07-01 14:00",
             "khaiValue": "72", "khaiGrade": "2", "pm10Value": "41", "pm10Grade": "2",
             "pm25Value": "-", "pm25Grade": "", "o3Value": "0.061", "no2Value": "0.012",
             "coValue": "0.4", "so2Value": "0.003"},
            {"stationName": "정자동(분당)", "dataTime": "2024-07-01 14:00", "khaiValue": "80", "khaiGrade": "3"}
        ]}
    }}"#;

    #[test]
    fn test_nearest_station_for_suwon() {
        let stations = parse_realtime(SAMPLE).unwrap();
        assert_eq!(stations.len(), 3);

        let loc = crate::places::resolve("수원시").unwrap();
        let reading = nearest_reading(&stations, &loc).unwrap();
        assert_eq!(reading.station_name, "인계동(수원)");
        assert_eq!((reading.lat, reading.lon), (37.2636, 127.0286));
        assert_eq!(reading.khai_value, 72.0);
        assert_eq!(reading.khai_grade, 2);
        assert_eq!(reading.pm25, 0.0);
        assert_eq!(reading.pm25_grade, 1);
        assert!(reading.distance_km < 0.01);
    }

    #[test]
    fn test_nearest_station_for_pangyo() {
        let stations = parse_realtime(SAMPLE).unwrap();
        let loc = crate::places::resolve("판교").unwrap();
        let reading = nearest_reading(&stations, &loc).unwrap();
        assert_eq!(reading.station_name, "정자동(분당)");
        // station coordinates, not the query's
        assert_eq!((reading.lat, reading.lon), (37.3838, 127.1192));
    }

    #[test]
    fn test_error_result_code() {
        let text = r#"{"response": {"header": {"resultCode": "30", "resultMsg": "SERVICE KEY IS NOT REGISTERED"}}}"#;
        let err = parse_realtime(text).unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }

    #[test]
    fn test_empty_station_list_has_no_record() {
        let loc = crate::places::resolve("수원").unwrap();
        let err = nearest_reading(&[], &loc).unwrap_err();
        assert!(matches!(err, ProviderError::NoMatchingRecord { .. }));
    }

    #[test]
    fn test_parse_grade_bounds() {
        assert_eq!(parse_grade(&Some("4".into())), 4);
        assert_eq!(parse_grade(&Some("5".into())), 1);
        assert_eq!(parse_grade(&None), 1);
    }
}
