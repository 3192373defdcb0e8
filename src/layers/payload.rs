//! Typed records produced by the data providers
//!
//! Each record knows how to render its key figures as a single summary line
//! for the agent's tool result.

use serde::{Deserialize, Serialize};

/// Data attached to an active layer, one variant per data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LayerPayload {
    Elderly(ElderlyStats),
    AirQuality(AirQualityReading),
    Weather(WeatherObservation),
    GreenSpace(GreenSpaceSummary),
    Hazard(HazardSummary),
}

impl LayerPayload {
    pub fn summary(&self) -> String {
        match self {
            LayerPayload::Elderly(r) => r.summary(),
            LayerPayload::AirQuality(r) => r.summary(),
            LayerPayload::Weather(r) => r.summary(),
            LayerPayload::GreenSpace(r) => r.summary(),
            LayerPayload::Hazard(r) => r.summary(),
        }
    }
}

/// 70+ population of a district
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElderlyStats {
    pub district_name: String,
    pub district_code: String,
    pub elderly_count: u64,
    /// Percent of total population
    pub elderly_ratio: f64,
}

impl ElderlyStats {
    pub fn summary(&self) -> String {
        format!(
            "{} ({}): 70세 이상 인구 {}명, 비율 {:.1}%",
            self.district_name,
            self.district_code,
            group_thousands(self.elderly_count),
            self.elderly_ratio
        )
    }
}

/// Realtime reading from the nearest air-quality station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub station_name: String,
    pub measured_at: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
    pub khai_value: f64,
    pub khai_grade: u8,
    pub pm10: f64,
    pub pm10_grade: u8,
    pub pm25: f64,
    pub pm25_grade: u8,
    pub o3: f64,
    pub no2: f64,
    pub co: f64,
    pub so2: f64,
}

impl AirQualityReading {
    pub fn summary(&self) -> String {
        format!(
            "{} 측정소 ({}, {:.1}km): 통합대기환경지수 {} ({}), PM10 {}㎍/㎥ ({}), PM2.5 {}㎍/㎥ ({}), O3 {}ppm",
            self.station_name,
            self.measured_at,
            self.distance_km,
            self.khai_value,
            grade_label(self.khai_grade),
            self.pm10,
            grade_label(self.pm10_grade),
            self.pm25,
            grade_label(self.pm25_grade),
            self.o3
        )
    }
}

/// Korean label for an AirKorea grade; anything outside 1..=4 is "good"
pub fn grade_label(grade: u8) -> &'static str {
    match grade {
        2 => "보통",
        3 => "나쁨",
        4 => "매우 나쁨",
        _ => "좋음",
    }
}

/// Hourly observation from the nearest weather station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub station_name: String,
    pub sigun_name: String,
    /// `YYYY-MM-DDTHH:00:00+09:00`
    pub observed_at: String,
    pub lat: f64,
    pub lon: f64,
    pub distance_km: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub heat_index: Option<f64>,
    pub wind_chill: Option<f64>,
}

impl WeatherObservation {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {} 관측소 ({}, {:.1}km): 기온 {}℃, 습도 {}%, 풍속 {}m/s",
            self.sigun_name,
            self.station_name,
            self.observed_at,
            self.distance_km,
            self.temperature,
            self.humidity,
            self.wind_speed
        );
        if let Some(hi) = self.heat_index {
            line.push_str(&format!(", 체감온도(열지수) {}℃", hi));
        }
        if let Some(wc) = self.wind_chill {
            line.push_str(&format!(", 체감온도(풍속냉각) {}℃", wc));
        }
        line
    }
}

/// Vegetation coverage aggregated over a location's districts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreenSpaceSummary {
    pub district_names: Vec<String>,
    pub total_area_m2: f64,
    pub feature_count: usize,
    /// Largest classifications first, at most five
    pub top_classes: Vec<BiotopeClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiotopeClass {
    pub name: String,
    pub area_m2: f64,
    pub count: usize,
}

impl GreenSpaceSummary {
    pub fn summary(&self) -> String {
        let classes = self
            .top_classes
            .iter()
            .map(|c| format!("{} {}", c.name, format_area(c.area_m2)))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "녹지 {}개 구역, 총 면적 {} (상위 유형: {})",
            self.feature_count,
            format_area(self.total_area_m2),
            if classes.is_empty() { "-".to_string() } else { classes }
        )
    }
}

/// Render an area in ㎡, ha or ㎢ depending on magnitude
pub fn format_area(m2: f64) -> String {
    if m2 >= 1_000_000.0 {
        format!("{:.2} ㎢", m2 / 1_000_000.0)
    } else if m2 >= 10_000.0 {
        format!("{:.2} ha", m2 / 10_000.0)
    } else {
        format!("{:.0} ㎡", m2)
    }
}

/// Flood trace sample for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSummary {
    pub total_features: u64,
    pub samples: Vec<FloodTrace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodTrace {
    pub depth_m: Option<f64>,
    pub grade: Option<String>,
    pub disaster_name: Option<String>,
}

impl HazardSummary {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "총 {}개 침수흔적 중 {}개 샘플",
            self.total_features,
            self.samples.len()
        )];
        for (idx, s) in self.samples.iter().enumerate() {
            parts.push(format!(
                "{}. 침수심 {}m, 등급 {}, 재해명 {}",
                idx + 1,
                s.depth_m.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into()),
                s.grade.as_deref().unwrap_or("N/A"),
                s.disaster_name.as_deref().unwrap_or("N/A")
            ));
        }
        parts.join(" / ")
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_area_units() {
        assert_eq!(format_area(2_500_000.0), "2.50 ㎢");
        assert_eq!(format_area(25_000.0), "2.50 ha");
        assert_eq!(format_area(950.4), "950 ㎡");
    }

    #[test]
    fn test_grade_label_defaults_to_good() {
        assert_eq!(grade_label(1), "좋음");
        assert_eq!(grade_label(3), "나쁨");
        assert_eq!(grade_label(0), "좋음");
        assert_eq!(grade_label(9), "좋음");
    }

    #[test]
    fn test_elderly_summary_contains_figures() {
        let stats = ElderlyStats {
            district_name: "수원시".into(),
            district_code: "31010".into(),
            elderly_count: 98765,
            elderly_ratio: 8.04,
        };
        let line = stats.summary();
        assert!(line.contains("98,765명"), "{}", line);
        assert!(line.contains("8.0%"), "{}", line);
    }

    #[test]
    fn test_payload_tagged_serialization() {
        let payload = LayerPayload::Hazard(HazardSummary {
            total_features: 0,
            samples: vec![],
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["source"], "hazard");
        assert_eq!(json["total_features"], 0);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
