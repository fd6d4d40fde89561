//! Great-circle distance on a spherical Earth
//!
//! Missing or non-finite inputs never error: they yield `f64::INFINITY`,
//! which callers read as "no match possible".

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[inline]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from optional parts, rejecting NaN and infinities
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some(Self { lat, lng }),
            _ => None,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Haversine distance to another coordinate (meters)
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine distance between two lat/lng pairs in degrees (meters)
///
/// Returns `f64::INFINITY` if any input is NaN or infinite.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    if !(lat1.is_finite() && lon1.is_finite() && lat2.is_finite() && lon2.is_finite()) {
        return f64::INFINITY;
    }

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two possibly-absent positions
#[inline]
pub fn distance_between(a: Option<Coordinate>, b: Option<Coordinate>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => a.distance_to(&b),
        _ => f64::INFINITY,
    }
}

/// Latitude offset in degrees that spans `meters` along a meridian
#[cfg(test)]
pub(crate) fn meters_to_lat_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNIS: Coordinate = Coordinate { lat: 36.8065, lng: 10.1815 };
    const SFAX: Coordinate = Coordinate { lat: 34.7406, lng: 10.7603 };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(TUNIS.distance_to(&TUNIS), 0.0);
        assert_eq!(distance_meters(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(distance_meters(-89.9, 179.9, -89.9, 179.9), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = TUNIS.distance_to(&SFAX);
        let ba = SFAX.distance_to(&TUNIS);
        assert!((ab - ba).abs() < 1e-6);
        // Tunis to Sfax is roughly 235 km as the crow flies
        assert!(ab > 225_000.0 && ab < 245_000.0, "got {ab}");
    }

    #[test]
    fn test_nan_input_is_infinite() {
        assert_eq!(distance_meters(f64::NAN, 10.0, 36.0, 10.0), f64::INFINITY);
        assert_eq!(distance_meters(36.0, 10.0, 36.0, f64::NAN), f64::INFINITY);
        assert_eq!(distance_meters(36.0, f64::INFINITY, 36.0, 10.0), f64::INFINITY);
    }

    #[test]
    fn test_missing_position_is_infinite() {
        assert_eq!(distance_between(None, Some(TUNIS)), f64::INFINITY);
        assert_eq!(distance_between(Some(TUNIS), None), f64::INFINITY);
        assert_eq!(distance_between(None, None), f64::INFINITY);
        assert_eq!(distance_between(Some(TUNIS), Some(TUNIS)), 0.0);
    }

    #[test]
    fn test_zero_coordinates_are_valid() {
        // Equator/prime meridian is a real place, not a missing value
        let d = distance_meters(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_meridian_offset_matches_distance() {
        let offset = meters_to_lat_degrees(50.0);
        let d = distance_meters(TUNIS.lat, TUNIS.lng, TUNIS.lat + offset, TUNIS.lng);
        assert!((d - 50.0).abs() < 1e-6, "got {d}");
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(Coordinate::from_parts(Some(1.0), Some(2.0)), Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(Coordinate::from_parts(None, Some(2.0)), None);
        assert_eq!(Coordinate::from_parts(Some(f64::NAN), Some(2.0)), None);
    }
}
