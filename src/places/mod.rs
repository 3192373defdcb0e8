//! Place resolution for Gyeonggi-do
//!
//! Free-text place names are normalized (province prefix and one trailing
//! 시/군 removed) and looked up in a static table. No I/O.

mod table;

use crate::core::PlaceNotFound;
use serde::{Deserialize, Serialize};

const PROVINCE_PREFIXES: &[&str] = &["경기도 ", "경기 "];
const ADMIN_SUFFIXES: &[char] = &['시', '군'];

/// Identifiers the providers need for a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderKeys {
    /// Search term for the demographic district lookup
    pub district_query: String,
    /// District names for the vegetation WFS filter
    pub sgg_names: Vec<String>,
}

/// A resolved place
///
/// Equality ignores `raw_name`, so "수원" and "경기도 수원시" compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalLocation {
    pub raw_name: String,
    pub normalized_name: String,
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
    pub zoom_hint: u8,
    pub provider_keys: ProviderKeys,
}

impl PartialEq for CanonicalLocation {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_name == other.normalized_name
            && self.display_name == other.display_name
            && self.lat == other.lat
            && self.lon == other.lon
            && self.zoom_hint == other.zoom_hint
            && self.provider_keys == other.provider_keys
    }
}

impl CanonicalLocation {
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// Strip the province qualifier and one administrative suffix
pub fn normalize(raw: &str) -> String {
    let mut name = raw.trim();
    for prefix in PROVINCE_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest.trim_start();
            break;
        }
    }

    if name.chars().count() > 1 {
        if let Some(stripped) = name.strip_suffix(ADMIN_SUFFIXES) {
            return stripped.to_string();
        }
    }
    name.to_string()
}

/// Whether two free-text names denote the same place after normalization
pub fn same_place(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Resolve a free-text place name to a canonical location
pub fn resolve(raw: &str) -> Result<CanonicalLocation, PlaceNotFound> {
    let normalized = normalize(raw);
    let entry = table::INDEX
        .get(normalized.as_str())
        .or_else(|| table::INDEX.get(raw.trim()))
        .ok_or_else(|| PlaceNotFound(raw.trim().to_string()))?;

    Ok(CanonicalLocation {
        raw_name: raw.to_string(),
        normalized_name: entry.key.to_string(),
        display_name: entry.display.to_string(),
        lat: entry.lat,
        lon: entry.lon,
        zoom_hint: entry.zoom,
        provider_keys: ProviderKeys {
            district_query: entry.district_query.to_string(),
            sgg_names: entry.sgg_names.iter().map(|s| s.to_string()).collect(),
        },
    })
}

/// Normalized names of every supported place
pub fn known_places() -> impl Iterator<Item = &'static str> {
    table::PLACES.iter().map(|p| p.key)
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_prefix_and_suffix() {
        assert_eq!(normalize("  경기도 수원시 "), "수원");
        assert_eq!(normalize("경기 가평군"), "가평");
        assert_eq!(normalize("성남"), "성남");
        // only one suffix is removed
        assert_eq!(normalize("시"), "시");
    }

    #[test]
    fn test_resolve_suffix_variants_are_equal() {
        let a = resolve("수원").unwrap();
        let b = resolve("수원시").unwrap();
        let c = resolve("경기도 수원시").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.display_name, "수원시");
        assert_eq!(b.raw_name, "수원시");
        assert_eq!(a.zoom_hint, 13);
    }

    #[test]
    fn test_resolve_alias_falls_back_to_raw() {
        let loc = resolve("분당구").unwrap();
        assert_eq!(loc.normalized_name, "분당");
        assert_eq!(loc.provider_keys.sgg_names, vec!["성남시분당구"]);
    }

    #[test]
    fn test_resolve_unknown_place() {
        let err = resolve("부산광역시").unwrap_err();
        assert_eq!(err, PlaceNotFound("부산광역시".to_string()));
    }

    #[test]
    fn test_haversine_known_distance() {
        // 수원 → 성남 is roughly 19 km
        let d = haversine_km((37.2636, 127.0286), (37.4201, 127.1265));
        assert!((17.0..=22.0).contains(&d), "{}", d);
        assert_eq!(haversine_km((37.0, 127.0), (37.0, 127.0)), 0.0);
    }

    #[test]
    fn test_same_place() {
        assert!(same_place("수원시", "수원"));
        assert!(!same_place("수원시", "성남시"));
    }
}
