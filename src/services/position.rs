//! GPS history index and stop-window position aggregation
//!
//! Fixes are grouped by whitespace-free plate and sorted by timestamp so a
//! stop window resolves to a contiguous slice via binary search.
//!
//! The representative position is the unweighted mean of every fix inside
//! the window. A vehicle that idles longer simply contributes more samples.

use crate::domain::geo::Coordinate;
use crate::domain::types::{GpsFix, VehicleKey};
use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

/// Unweighted centroid of the fixes with `begin <= timestamp <= end`
///
/// Fixes with non-finite coordinates are skipped. Returns `None` when no
/// usable fix falls in the window.
pub fn mean_position<'a, I>(fixes: I, begin: NaiveDateTime, end: NaiveDateTime) -> Option<Coordinate>
where
    I: IntoIterator<Item = &'a GpsFix>,
{
    let mut sum_lat = 0.0;
    let mut sum_lng = 0.0;
    let mut count = 0usize;

    for fix in fixes {
        if fix.timestamp < begin || fix.timestamp > end {
            continue;
        }
        if let Some(pos) = fix.position() {
            sum_lat += pos.lat;
            sum_lng += pos.lng;
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }
    Some(Coordinate::new(sum_lat / count as f64, sum_lng / count as f64))
}

/// Window aggregate: centroid plus the number of fixes it was built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPosition {
    pub position: Coordinate,
    pub samples: usize,
}

/// Per-vehicle GPS history, borrowed from a fix snapshot
#[derive(Debug, Default)]
pub struct GpsHistory<'a> {
    by_vehicle: FxHashMap<VehicleKey, Vec<&'a GpsFix>>,
}

impl<'a> GpsHistory<'a> {
    /// Index a snapshot of fixes (any order, any vehicle)
    pub fn from_fixes(fixes: &'a [GpsFix]) -> Self {
        let mut by_vehicle: FxHashMap<VehicleKey, Vec<&'a GpsFix>> = FxHashMap::default();
        for fix in fixes {
            by_vehicle.entry(VehicleKey::new(&fix.vehicle_id)).or_default().push(fix);
        }
        // Stable: equal timestamps keep their snapshot order
        for track in by_vehicle.values_mut() {
            track.sort_by_key(|fix| fix.timestamp);
        }
        Self { by_vehicle }
    }

    pub fn vehicle_count(&self) -> usize {
        self.by_vehicle.len()
    }

    /// All fixes of a vehicle, oldest first
    pub fn fixes_for(&self, vehicle_id: &str) -> &[&'a GpsFix] {
        self.by_vehicle
            .get(&VehicleKey::new(vehicle_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fixes of a vehicle with `begin <= timestamp <= end`, oldest first
    pub fn window(&self, vehicle_id: &str, begin: NaiveDateTime, end: NaiveDateTime) -> &[&'a GpsFix] {
        let track = self.fixes_for(vehicle_id);
        if begin > end {
            return &[];
        }
        let start = track.partition_point(|fix| fix.timestamp < begin);
        let stop = track.partition_point(|fix| fix.timestamp <= end);
        &track[start..stop]
    }

    /// Mean position of a vehicle during `[begin, end]`
    pub fn window_position(
        &self,
        vehicle_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Option<WindowPosition> {
        let window = self.window(vehicle_id, begin, end);
        let position = mean_position(window.iter().copied(), begin, end)?;
        let samples = window.iter().filter(|fix| fix.position().is_some()).count();
        Some(WindowPosition { position, samples })
    }

    /// Most recent fix of a vehicle
    pub fn latest(&self, vehicle_id: &str) -> Option<&'a GpsFix> {
        self.fixes_for(vehicle_id).last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn fix(vehicle: &str, t: NaiveDateTime, lat: f64, lng: f64) -> GpsFix {
        GpsFix::new(vehicle, t, lat, lng)
    }

    #[test]
    fn test_mean_position_empty_is_none() {
        let fixes: Vec<GpsFix> = Vec::new();
        assert_eq!(mean_position(&fixes, at(8, 0), at(9, 0)), None);
    }

    #[test]
    fn test_mean_position_single_fix_is_exact() {
        let fixes = vec![fix("A", at(8, 10), 36.8123, 10.1456)];
        assert_eq!(mean_position(&fixes, at(8, 0), at(9, 0)), Some(Coordinate::new(36.8123, 10.1456)));
    }

    #[test]
    fn test_mean_position_is_unweighted_centroid() {
        let fixes = vec![
            fix("A", at(8, 0), 36.80, 10.18),
            fix("A", at(8, 1), 36.80, 10.18),
            fix("A", at(8, 59), 36.83, 10.21),
        ];
        let pos = mean_position(&fixes, at(8, 0), at(9, 0)).unwrap();
        assert!((pos.lat - 36.81).abs() < 1e-9);
        assert!((pos.lng - 10.19).abs() < 1e-9);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let fixes = vec![
            fix("A", at(7, 59), 0.0, 0.0),
            fix("A", at(8, 0), 36.80, 10.18),
            fix("A", at(8, 30), 36.81, 10.19),
            fix("A", at(8, 31), 50.0, 50.0),
        ];
        let history = GpsHistory::from_fixes(&fixes);
        let window = history.window("A", at(8, 0), at(8, 30));
        assert_eq!(window.len(), 2);

        let agg = history.window_position("A", at(8, 0), at(8, 30)).unwrap();
        assert_eq!(agg.samples, 2);
        assert!((agg.position.lat - 36.805).abs() < 1e-9);
        assert!((agg.position.lng - 10.185).abs() < 1e-9);
    }

    #[test]
    fn test_history_sorts_unordered_input() {
        let fixes = vec![
            fix("A", at(9, 0), 3.0, 3.0),
            fix("A", at(7, 0), 1.0, 1.0),
            fix("A", at(8, 0), 2.0, 2.0),
        ];
        let history = GpsHistory::from_fixes(&fixes);
        let lats: Vec<Option<f64>> = history.fixes_for("A").iter().map(|f| f.latitude).collect();
        assert_eq!(lats, vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(history.latest("A").and_then(|f| f.latitude), Some(3.0));
    }

    #[test]
    fn test_history_matches_plates_without_whitespace() {
        let fixes = vec![fix("120TDS4578", at(8, 5), 36.80, 10.18)];
        let history = GpsHistory::from_fixes(&fixes);
        assert_eq!(history.fixes_for("120 TDS 4578").len(), 1);
        assert_eq!(history.vehicle_count(), 1);
        assert!(history.fixes_for("999 TU 1").is_empty());
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let fixes = vec![fix("A", at(8, 15), 36.80, 10.18)];
        let history = GpsHistory::from_fixes(&fixes);
        assert!(history.window("A", at(9, 0), at(8, 0)).is_empty());
        assert_eq!(history.window_position("A", at(9, 0), at(8, 0)), None);
    }

    #[test]
    fn test_non_finite_fixes_are_skipped() {
        let fixes = vec![fix("A", at(8, 0), f64::NAN, 10.0), fix("A", at(8, 1), 36.0, 10.0)];
        let history = GpsHistory::from_fixes(&fixes);
        let agg = history.window_position("A", at(8, 0), at(8, 5)).unwrap();
        assert_eq!(agg.samples, 1);
        assert_eq!(agg.position, Coordinate::new(36.0, 10.0));
    }
}
