//! Nearest point-of-interest lookup
//!
//! POI sets are small (dozens to a few hundred entries), so a linear scan
//! is enough. The strict `<` comparison keeps the first POI on ties.

use crate::domain::geo::Coordinate;
use crate::domain::types::Poi;

/// Result of a nearest-POI query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoi<'a> {
    pub poi: Option<&'a Poi>,
    /// `f64::INFINITY` when no POI could be measured
    pub distance_m: f64,
}

impl<'a> NearestPoi<'a> {
    /// Nothing measurable
    pub fn none() -> Self {
        Self { poi: None, distance_m: f64::INFINITY }
    }

    pub fn name(&self) -> Option<&str> {
        self.poi.map(|poi| poi.name.as_str())
    }
}

/// Snapshot of POIs for one classification pass
#[derive(Debug, Clone, Copy)]
pub struct PoiIndex<'a> {
    pois: &'a [Poi],
}

impl<'a> PoiIndex<'a> {
    pub fn new(pois: &'a [Poi]) -> Self {
        Self { pois }
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Closest POI to `at`, first in input order on ties
    pub fn nearest(&self, at: Coordinate) -> NearestPoi<'a> {
        let mut best = NearestPoi::none();

        for poi in self.pois {
            let Some(pos) = poi.position() else {
                continue;
            };
            let d = at.distance_to(&pos);
            if d < best.distance_m {
                best = NearestPoi { poi: Some(poi), distance_m: d };
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::meters_to_lat_degrees;

    fn poi(id: i64, name: &str, lat: f64, lng: f64) -> Poi {
        Poi {
            id,
            name: name.to_string(),
            group: None,
            poi_type: "Point".to_string(),
            lat: Some(lat),
            lng: Some(lng),
            address: None,
        }
    }

    #[test]
    fn test_empty_index_has_no_nearest() {
        let index = PoiIndex::new(&[]);
        let nearest = index.nearest(Coordinate::new(36.8, 10.18));
        assert!(nearest.poi.is_none());
        assert_eq!(nearest.distance_m, f64::INFINITY);
        assert_eq!(nearest, NearestPoi::none());
    }

    #[test]
    fn test_nearest_picks_closest() {
        let pois = vec![
            poi(1, "Far", 36.90, 10.30),
            poi(2, "Near", 36.8001, 10.18),
            poi(3, "Mid", 36.81, 10.18),
        ];
        let index = PoiIndex::new(&pois);
        let nearest = index.nearest(Coordinate::new(36.80, 10.18));
        assert_eq!(nearest.name(), Some("Near"));
        assert!(nearest.distance_m > 10.0 && nearest.distance_m < 12.0);
    }

    #[test]
    fn test_tie_goes_to_first_in_input_order() {
        let off = meters_to_lat_degrees(25.0);
        let pois = vec![poi(1, "North", 36.80 + off, 10.18), poi(2, "South", 36.80 - off, 10.18)];
        let index = PoiIndex::new(&pois);
        assert_eq!(index.nearest(Coordinate::new(36.80, 10.18)).name(), Some("North"));

        let dup = vec![poi(7, "First", 36.80, 10.18), poi(8, "Second", 36.80, 10.18)];
        let index = PoiIndex::new(&dup);
        assert_eq!(index.nearest(Coordinate::new(36.80, 10.18)).poi.map(|p| p.id), Some(7));
    }

    #[test]
    fn test_unusable_poi_is_never_selected() {
        let pois = vec![poi(1, "Broken", f64::NAN, 10.18), poi(2, "Real", 37.0, 10.0)];
        let index = PoiIndex::new(&pois);
        assert_eq!(index.len(), 2);
        assert_eq!(index.nearest(Coordinate::new(36.80, 10.18)).name(), Some("Real"));
    }
}
