//! Decide whether the active layer set can be kept as is
//!
//! The decision is all-or-nothing: on update the caller discards every
//! current layer and builds a fresh set. There is no partial merge.

use super::{ActiveLayer, LayerKind};
use crate::places::CanonicalLocation;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileReason {
    /// Requested kinds and active kinds are the same and bound to the same place
    Unchanged,
    /// Requested kind set differs in size or membership
    KindsChanged,
    /// A data-bearing layer is bound to a different location
    LocationChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileDecision {
    pub needs_update: bool,
    pub reason: ReconcileReason,
}

impl ReconcileDecision {
    fn keep() -> Self {
        Self {
            needs_update: false,
            reason: ReconcileReason::Unchanged,
        }
    }

    fn rebuild(reason: ReconcileReason) -> Self {
        Self {
            needs_update: true,
            reason,
        }
    }
}

pub fn reconcile(
    current: &[ActiveLayer],
    requested: &[LayerKind],
    location: Option<&CanonicalLocation>,
) -> ReconcileDecision {
    let active: HashSet<LayerKind> = current.iter().map(|l| l.kind).collect();
    let wanted: HashSet<LayerKind> = requested.iter().copied().collect();

    if active != wanted {
        return ReconcileDecision::rebuild(ReconcileReason::KindsChanged);
    }

    let target = location.map(|l| l.normalized_name.as_str());
    let moved = current
        .iter()
        .filter(|l| l.kind.is_data_bearing())
        .any(|l| l.bound_location.as_deref() != target);

    if moved {
        ReconcileDecision::rebuild(ReconcileReason::LocationChanged)
    } else {
        ReconcileDecision::keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places;

    fn layer(kind: LayerKind, place: &str) -> ActiveLayer {
        let loc = places::resolve(place).unwrap();
        ActiveLayer::new(kind, 0.75, None, Some(&loc), None)
    }

    #[test]
    fn test_same_kinds_same_place_is_unchanged() {
        let current = vec![layer(LayerKind::ElderlyPopulation, "수원시")];
        let loc = places::resolve("수원").unwrap();
        let d = reconcile(&current, &[LayerKind::ElderlyPopulation], Some(&loc));
        assert!(!d.needs_update);
        assert_eq!(d.reason, ReconcileReason::Unchanged);
    }

    #[test]
    fn test_kind_membership_change_rebuilds() {
        let current = vec![layer(LayerKind::ElderlyPopulation, "수원")];
        let loc = places::resolve("수원").unwrap();
        let d = reconcile(
            &current,
            &[LayerKind::ElderlyPopulation, LayerKind::FloodRisk],
            Some(&loc),
        );
        assert_eq!(d.reason, ReconcileReason::KindsChanged);

        let d = reconcile(&current, &[LayerKind::FloodRisk], Some(&loc));
        assert!(d.needs_update);
    }

    #[test]
    fn test_location_change_rebuilds_data_layers() {
        let current = vec![layer(LayerKind::Weather, "수원")];
        let loc = places::resolve("성남").unwrap();
        let d = reconcile(&current, &[LayerKind::Weather], Some(&loc));
        assert_eq!(d.reason, ReconcileReason::LocationChanged);
    }

    #[test]
    fn test_visual_only_layer_ignores_location() {
        let current = vec![layer(LayerKind::HeatwaveVulnerability, "수원")];
        let loc = places::resolve("성남").unwrap();
        let d = reconcile(&current, &[LayerKind::HeatwaveVulnerability], Some(&loc));
        assert!(!d.needs_update);
    }

    #[test]
    fn test_empty_to_empty_is_unchanged() {
        let d = reconcile(&[], &[], None);
        assert!(!d.needs_update);
        let d = reconcile(&[], &[LayerKind::AirQuality], None);
        assert!(d.needs_update);
    }
}
