//! JSON views served to the dashboard
//!
//! Field names and placeholders match what the web client renders:
//! French keys, "-" / "—" for missing values, distances rounded to meters.

use crate::domain::stop::{ConformityStatus, EnrichedStop};
use crate::domain::types::Poi;
use crate::infra::config::{Config, CONFORME_COLOR, NON_CONFORME_COLOR};
use crate::services::audit::AuditSummary;
use crate::services::fleet::VehicleSnapshot;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Label shown instead of a distance that could not be measured
pub const DISTANCE_UNAVAILABLE: &str = "unavailable";

/// Suggested follow-up for a stop away from every known POI
pub const ACTION_ADD_POI: &str = "ajouter_poi";

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    pub success: bool,
    pub message: &'a str,
}

impl<'a> ErrorEnvelope<'a> {
    pub fn new(message: &'a str) -> Self {
        Self { success: false, message }
    }
}

/// "YYYY-MM-DD HH:MM"
pub fn format_minute(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

pub fn status_color(status: ConformityStatus) -> &'static str {
    match status {
        ConformityStatus::Conforme => CONFORME_COLOR,
        ConformityStatus::NonConforme => NON_CONFORME_COLOR,
    }
}

/// Stop table row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRow {
    pub id: usize,
    pub camion: String,
    pub date: String,
    pub duree: String,
    pub poi_gps: String,
    pub poi_planning: String,
    pub status: ConformityStatus,
    pub status_color: &'static str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub distance: Option<i64>,
    pub distance_label: String,
    pub gps_samples: usize,
    pub action: Option<&'static str>,
}

impl StopRow {
    /// Build a row; `position` is the 0-based index in the displayed list
    pub fn from_stop(position: usize, stop: &EnrichedStop) -> Self {
        let distance = stop.nearest_poi_distance_m.map(|d| d.round() as i64);
        let distance_label = match distance {
            Some(d) => format!("{d} m"),
            None => DISTANCE_UNAVAILABLE.to_string(),
        };
        Self {
            id: position + 1,
            camion: if stop.vehicle_id.is_empty() { "Inconnu".to_string() } else { stop.vehicle_id.clone() },
            date: format_minute(&stop.begin_time),
            duree: stop.duration_label.clone(),
            poi_gps: stop.declared_address.clone().unwrap_or_else(|| "-".to_string()),
            poi_planning: stop.nearest_poi_name.clone().unwrap_or_else(|| "-".to_string()),
            status: stop.status,
            status_color: status_color(stop.status),
            lat: stop.reference.map(|c| c.lat),
            lng: stop.reference.map(|c| c.lng),
            distance,
            distance_label,
            gps_samples: stop.gps_samples,
            action: (!stop.status.is_conforme()).then_some(ACTION_ADD_POI),
        }
    }
}

/// Stop listing with its summary counts
#[derive(Debug, Serialize)]
pub struct StopListing {
    pub summary: AuditSummary,
    pub stops: Vec<StopRow>,
}

impl StopListing {
    pub fn new(stops: &[EnrichedStop]) -> Self {
        Self {
            summary: AuditSummary::from_stops(stops),
            stops: stops.iter().enumerate().map(|(i, s)| StopRow::from_stop(i, s)).collect(),
        }
    }
}

/// Vehicle table row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRow {
    pub id: usize,
    pub plaque: String,
    pub chauffeur: String,
    pub telephone: String,
    pub localisation: String,
    pub vitesse: f64,
    pub statut: &'static str,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub kilometrage: f64,
    pub derniere_maj: String,
    pub ignition: Option<bool>,
}

impl VehicleRow {
    pub fn from_snapshot(position: usize, snapshot: &VehicleSnapshot) -> Self {
        let pos = snapshot.position();
        let fix = snapshot.last_fix.as_ref();
        Self {
            id: position + 1,
            plaque: snapshot.vehicle.plate.clone(),
            chauffeur: snapshot.vehicle.driver.clone().unwrap_or_else(|| "—".to_string()),
            telephone: snapshot.vehicle.phone.clone().unwrap_or_else(|| "—".to_string()),
            localisation: pos
                .map(|c| format!("{:.4}, {:.4}", c.lat, c.lng))
                .unwrap_or_else(|| "—".to_string()),
            vitesse: snapshot.speed_kmh(),
            statut: snapshot.status.as_str(),
            lat: pos.map(|c| c.lat),
            lng: pos.map(|c| c.lng),
            kilometrage: fix.and_then(|f| f.odometer).unwrap_or(0.0),
            derniere_maj: fix.map(|f| format_minute(&f.timestamp)).unwrap_or_else(|| "—".to_string()),
            ignition: fix.and_then(|f| f.ignition_on),
        }
    }
}

/// POI with its group legend color
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiRow {
    #[serde(flatten)]
    pub poi: Poi,
    pub couleur: String,
}

impl PoiRow {
    pub fn new(poi: Poi, config: &Config) -> Self {
        let couleur = config.group_color(poi.group.as_deref()).to_string();
        Self { poi, couleur }
    }
}
