//! Stop records and their audited form

use crate::domain::geo::Coordinate;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Placeholder shown when a stop has no stored duration
pub const DURATION_PLACEHOLDER: &str = "-";

/// Stored dwell duration (interval split into days, hours, minutes, seconds)
///
/// Labels count whole hours, so days fold into hours and seconds are
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StopDuration {
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl StopDuration {
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self { days: 0, hours, minutes, seconds: 0 }
    }

    pub fn total_hours(&self) -> u32 {
        self.days * 24 + self.hours
    }

    /// Human-readable form, e.g. "1h 25min"
    pub fn label(&self) -> String {
        format!("{}h {}min", self.total_hours(), self.minutes)
    }
}

/// Duration label for an optional duration
pub fn duration_label(duration: Option<&StopDuration>) -> String {
    duration.map_or_else(|| DURATION_PLACEHOLDER.to_string(), StopDuration::label)
}

/// One detected dwell for a vehicle, produced by upstream stop detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    #[serde(rename = "camion")]
    pub vehicle_id: String,
    #[serde(rename = "beginstoptime")]
    pub begin_time: NaiveDateTime,
    #[serde(rename = "endstoptime")]
    pub end_time: NaiveDateTime,
    #[serde(rename = "stopduration", default)]
    pub duration: Option<StopDuration>,
    #[serde(rename = "latitude", default)]
    pub declared_lat: Option<f64>,
    #[serde(rename = "longitude", default)]
    pub declared_lng: Option<f64>,
    #[serde(rename = "address", default)]
    pub declared_address: Option<String>,
}

impl StopRecord {
    pub fn new(vehicle_id: &str, begin_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            begin_time,
            end_time,
            duration: None,
            declared_lat: None,
            declared_lng: None,
            declared_address: None,
        }
    }

    pub fn with_declared_position(mut self, lat: f64, lng: f64) -> Self {
        self.declared_lat = Some(lat);
        self.declared_lng = Some(lng);
        self
    }

    pub fn with_duration(mut self, hours: u32, minutes: u32) -> Self {
        self.duration = Some(StopDuration::new(hours, minutes));
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.declared_address = Some(address.to_string());
        self
    }

    /// Position reported by the stop detector, if usable
    #[inline]
    pub fn declared_position(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.declared_lat, self.declared_lng)
    }
}

/// Conformity verdict for a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformityStatus {
    Conforme,
    NonConforme,
}

impl ConformityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConformityStatus::Conforme => "conforme",
            ConformityStatus::NonConforme => "non_conforme",
        }
    }

    #[inline]
    pub fn is_conforme(&self) -> bool {
        matches!(self, ConformityStatus::Conforme)
    }
}

impl std::str::FromStr for ConformityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conforme" => Ok(ConformityStatus::Conforme),
            "non_conforme" => Ok(ConformityStatus::NonConforme),
            other => Err(format!("unknown conformity status: {other}")),
        }
    }
}

/// Where a stop's reference position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Mean of the GPS fixes recorded during the stop
    Gps,
    /// Stop detector's declared position (no fixes in the window)
    Declared,
    /// Neither fixes nor a declared position
    Unavailable,
}

/// Stop with its reference position and conformity verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedStop {
    pub vehicle_id: String,
    pub begin_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration: Option<StopDuration>,
    pub duration_label: String,
    pub declared_address: Option<String>,
    pub reference: Option<Coordinate>,
    pub position_source: PositionSource,
    pub gps_samples: usize,
    pub nearest_poi_name: Option<String>,
    /// `None` when no finite distance could be measured
    pub nearest_poi_distance_m: Option<f64>,
    pub status: ConformityStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_label() {
        assert_eq!(StopDuration::new(1, 25).label(), "1h 25min");
        assert_eq!(duration_label(Some(&StopDuration::new(0, 7))), "0h 7min");
        assert_eq!(duration_label(None), "-");
    }

    #[test]
    fn test_duration_label_folds_days_into_hours() {
        let duration: StopDuration =
            serde_json::from_str(r#"{"days": 1, "hours": 2, "minutes": 5, "seconds": 59}"#).unwrap();
        assert_eq!(duration.total_hours(), 26);
        assert_eq!(duration.label(), "26h 5min");
    }

    #[test]
    fn test_stop_record_from_storage_json() {
        let json = r#"{
            "camion": "120 TDS 4578",
            "beginstoptime": "2025-03-01T08:00:00",
            "endstoptime": "2025-03-01T08:30:00",
            "stopduration": {"minutes": 30},
            "latitude": 36.8,
            "longitude": 10.18,
            "address": "Rue de Marseille, Tunis"
        }"#;
        let stop: StopRecord = serde_json::from_str(json).unwrap();
        assert_eq!(stop.duration, Some(StopDuration::new(0, 30)));
        assert_eq!(stop.declared_position(), Some(Coordinate::new(36.8, 10.18)));
        assert_eq!(stop.declared_address.as_deref(), Some("Rue de Marseille, Tunis"));
    }

    #[test]
    fn test_declared_position_requires_both_parts() {
        let json = r#"{
            "camion": "X",
            "beginstoptime": "2025-03-01T08:00:00",
            "endstoptime": "2025-03-01T08:30:00",
            "latitude": 36.8
        }"#;
        let stop: StopRecord = serde_json::from_str(json).unwrap();
        assert_eq!(stop.declared_position(), None);
        assert_eq!(stop.duration, None);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ConformityStatus::Conforme.as_str(), "conforme");
        assert_eq!(
            serde_json::to_string(&ConformityStatus::NonConforme).unwrap(),
            "\"non_conforme\""
        );
        assert_eq!("non_conforme".parse::<ConformityStatus>(), Ok(ConformityStatus::NonConforme));
        assert!("warning".parse::<ConformityStatus>().is_err());
    }
}
