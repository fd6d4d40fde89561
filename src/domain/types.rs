//! Shared record types for fleet data
//!
//! Field names on the wire follow the storage tables (`camion`,
//! `gps_timestamp`, `nom`, ...); Rust names follow what the fields mean.

use crate::domain::geo::Coordinate;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Vehicle identifier with all whitespace removed
///
/// Plates are stored as "120 TDS 4578" in one table and "120TDS4578" in
/// another, so every cross-table match goes through this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[repr(transparent)]
pub struct VehicleKey(String);

impl VehicleKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.chars().filter(|c| !c.is_whitespace()).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VehicleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One raw GPS sample from the telemetry history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    #[serde(rename = "camion")]
    pub vehicle_id: String,
    #[serde(rename = "gps_timestamp")]
    pub timestamp: NaiveDateTime,
    /// `None` when the tracker reported no position
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "speed", default)]
    pub speed_kmh: Option<f64>,
    #[serde(default)]
    pub odometer: Option<f64>,
    #[serde(rename = "ignition", default)]
    pub ignition_on: Option<bool>,
}

impl GpsFix {
    pub fn new(vehicle_id: &str, timestamp: NaiveDateTime, latitude: f64, longitude: f64) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            timestamp,
            latitude: Some(latitude),
            longitude: Some(longitude),
            speed_kmh: None,
            odometer: None,
            ignition_on: None,
        }
    }

    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = Some(speed_kmh);
        self
    }

    pub fn with_odometer(mut self, odometer: f64) -> Self {
        self.odometer = Some(odometer);
        self
    }

    pub fn with_ignition(mut self, on: bool) -> Self {
        self.ignition_on = Some(on);
        self
    }

    /// Position of the fix, `None` if either coordinate is unusable
    #[inline]
    pub fn position(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.latitude, self.longitude)
    }
}

/// Fleet roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "camion")]
    pub plate: String,
    #[serde(rename = "chauffeur", default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Vehicle {
    pub fn new(plate: &str) -> Self {
        Self { plate: plate.to_string(), driver: None, phone: None }
    }
}

/// Point of interest: an authorized site (depot, client, station)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "groupe", default)]
    pub group: Option<String>,
    #[serde(rename = "type", default = "default_poi_type")]
    pub poi_type: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(rename = "adresse", default)]
    pub address: Option<String>,
}

pub fn default_poi_type() -> String {
    "Point".to_string()
}

impl Poi {
    #[inline]
    pub fn position(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lng)
    }
}

/// POI fields supplied by a create or update request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiDraft {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "groupe", default)]
    pub group: Option<String>,
    #[serde(rename = "type", default)]
    pub poi_type: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "adresse", default)]
    pub address: Option<String>,
}

impl PoiDraft {
    /// First rule the draft breaks, if any
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("name must not be empty");
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Some("latitude must be within [-90, 90]");
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Some("longitude must be within [-180, 180]");
        }
        None
    }

    pub fn into_poi(self, id: i64) -> Poi {
        Poi {
            id,
            name: self.name,
            group: self.group,
            poi_type: self.poi_type.unwrap_or_else(default_poi_type),
            lat: Some(self.lat),
            lng: Some(self.lng),
            address: self.address,
        }
    }
}
