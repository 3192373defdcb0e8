//! Layer kinds, their static metadata, and the active layer set

mod payload;
pub mod reconcile;

pub use payload::{
    format_area, grade_label, AirQualityReading, BiotopeClass, ElderlyStats, FloodTrace,
    GreenSpaceSummary, HazardSummary, LayerPayload, WeatherObservation,
};
pub use reconcile::{reconcile, ReconcileDecision, ReconcileReason};

use crate::places::CanonicalLocation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// The closed set of indicators the agent can activate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    #[serde(rename = "flood_risk")]
    FloodRisk,
    #[serde(rename = "heatwave")]
    HeatwaveVulnerability,
    #[serde(rename = "elderly")]
    ElderlyPopulation,
    #[serde(rename = "parks")]
    GreenSpace,
    #[serde(rename = "air_quality")]
    AirQuality,
    #[serde(rename = "weather")]
    Weather,
}

/// Where a layer's payload comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Demographic,
    AirQuality,
    Weather,
    Vegetation,
    HazardGeometry,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Demographic => "demographic",
            DataSource::AirQuality => "air_quality",
            DataSource::Weather => "weather",
            DataSource::Vegetation => "vegetation",
            DataSource::HazardGeometry => "hazard_geometry",
        }
    }
}

/// Static per-kind metadata
#[derive(Debug, Clone, Copy)]
pub struct LayerMeta {
    pub display_name: &'static str,
    pub color: &'static str,
    pub source: Option<DataSource>,
    /// WMS background layer id on the Gyeonggi climate platform
    pub wms_layer: Option<&'static str>,
}

impl LayerKind {
    pub const ALL: [LayerKind; 6] = [
        LayerKind::FloodRisk,
        LayerKind::HeatwaveVulnerability,
        LayerKind::ElderlyPopulation,
        LayerKind::GreenSpace,
        LayerKind::AirQuality,
        LayerKind::Weather,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::FloodRisk => "flood_risk",
            LayerKind::HeatwaveVulnerability => "heatwave",
            LayerKind::ElderlyPopulation => "elderly",
            LayerKind::GreenSpace => "parks",
            LayerKind::AirQuality => "air_quality",
            LayerKind::Weather => "weather",
        }
    }

    pub fn meta(&self) -> LayerMeta {
        match self {
            LayerKind::FloodRisk => LayerMeta {
                display_name: "침수위험지역",
                color: "#ef4444",
                source: Some(DataSource::HazardGeometry),
                wms_layer: Some("spggcee:tm_fldn_trce"),
            },
            LayerKind::HeatwaveVulnerability => LayerMeta {
                display_name: "폭염취약성",
                color: "#f97316",
                source: None,
                wms_layer: Some("spggcee:rst_thrcf_evl_41"),
            },
            LayerKind::ElderlyPopulation => LayerMeta {
                display_name: "노인 인구 밀도",
                color: "#8b5cf6",
                source: Some(DataSource::Demographic),
                wms_layer: Some("spggcee:tm_sigun_flod_dngr_evl_rnk"),
            },
            LayerKind::GreenSpace => LayerMeta {
                display_name: "녹지 및 공원",
                color: "#22c55e",
                source: Some(DataSource::Vegetation),
                wms_layer: Some("spggcee:grbt"),
            },
            LayerKind::AirQuality => LayerMeta {
                display_name: "대기질 정보",
                color: "#06b6d4",
                source: Some(DataSource::AirQuality),
                wms_layer: None,
            },
            LayerKind::Weather => LayerMeta {
                display_name: "기상 관측",
                color: "#3b82f6",
                source: Some(DataSource::Weather),
                wms_layer: None,
            },
        }
    }

    pub fn data_source(&self) -> Option<DataSource> {
        self.meta().source
    }

    /// Whether the layer carries fetched data (and so is bound to a location)
    pub fn is_data_bearing(&self) -> bool {
        self.data_source().is_some()
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layer kind '{}'", s))
    }
}

/// A layer currently shown for the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLayer {
    pub id: String,
    pub kind: LayerKind,
    pub opacity: f32,
    pub visible: bool,
    pub filter: Option<String>,
    /// Normalized name of the location the payload was fetched for
    pub bound_location: Option<String>,
    pub payload: Option<LayerPayload>,
}

impl ActiveLayer {
    pub fn new(
        kind: LayerKind,
        opacity: f32,
        filter: Option<String>,
        location: Option<&CanonicalLocation>,
        payload: Option<LayerPayload>,
    ) -> Self {
        Self {
            id: format!("layer-{}-{}", kind.as_str(), Uuid::new_v4()),
            kind,
            opacity,
            visible: true,
            filter,
            bound_location: location.map(|l| l.normalized_name.clone()),
            payload,
        }
    }
}

/// Build a fresh layer set, one layer per distinct requested kind
///
/// Kinds keep their requested order; payloads missing from `payloads` leave
/// the layer without data.
pub fn build_layer_set(
    requested: &[LayerKind],
    location: Option<&CanonicalLocation>,
    filter: Option<&str>,
    opacity: f32,
    payloads: &mut HashMap<LayerKind, LayerPayload>,
) -> Vec<ActiveLayer> {
    let mut layers: Vec<ActiveLayer> = Vec::with_capacity(requested.len());
    for kind in requested {
        if layers.iter().any(|l| l.kind == *kind) {
            continue;
        }
        layers.push(ActiveLayer::new(
            *kind,
            opacity,
            filter.map(str::to_string),
            location,
            payloads.remove(kind),
        ));
    }
    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places;

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&LayerKind::GreenSpace).unwrap();
        assert_eq!(json, "\"parks\"");
        let kind: LayerKind = serde_json::from_str("\"heatwave\"").unwrap();
        assert_eq!(kind, LayerKind::HeatwaveVulnerability);
        for kind in LayerKind::ALL {
            assert_eq!(kind.as_str().parse::<LayerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_heatwave_is_visual_only() {
        assert!(!LayerKind::HeatwaveVulnerability.is_data_bearing());
        assert!(LayerKind::ElderlyPopulation.is_data_bearing());
        assert_eq!(
            LayerKind::ElderlyPopulation.data_source(),
            Some(DataSource::Demographic)
        );
    }

    #[test]
    fn test_build_layer_set_dedupes_and_binds() {
        let loc = places::resolve("수원시").unwrap();
        let mut payloads = HashMap::new();
        let layers = build_layer_set(
            &[LayerKind::FloodRisk, LayerKind::FloodRisk, LayerKind::Weather],
            Some(&loc),
            None,
            0.75,
            &mut payloads,
        );
        assert_eq!(layers.len(), 2);
        assert!(layers[0].id.starts_with("layer-flood_risk-"));
        assert_eq!(layers[0].bound_location.as_deref(), Some("수원"));
        assert!(layers.iter().all(|l| l.visible && l.payload.is_none()));
        assert_ne!(layers[0].id, layers[1].id);
    }
}
