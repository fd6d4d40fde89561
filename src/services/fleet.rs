//! Fleet overview: last-known state per vehicle and trajectories

use crate::domain::geo::Coordinate;
use crate::domain::types::{GpsFix, Vehicle};
use crate::services::position::GpsHistory;
use serde::Serialize;

/// Movement status derived from the last reported speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    EnRoute,
    Arrete,
}

impl MovementStatus {
    /// `en_route` only for a strictly positive speed
    pub fn from_speed(speed_kmh: Option<f64>) -> Self {
        match speed_kmh {
            Some(v) if v > 0.0 => MovementStatus::EnRoute,
            _ => MovementStatus::Arrete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::EnRoute => "en_route",
            MovementStatus::Arrete => "arrete",
        }
    }
}

/// Vehicle with its most recent GPS fix
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub vehicle: Vehicle,
    pub last_fix: Option<GpsFix>,
    pub status: MovementStatus,
}

impl VehicleSnapshot {
    pub fn position(&self) -> Option<Coordinate> {
        self.last_fix.as_ref().and_then(GpsFix::position)
    }

    pub fn speed_kmh(&self) -> f64 {
        self.last_fix.as_ref().and_then(|f| f.speed_kmh).unwrap_or(0.0)
    }
}

/// One snapshot per roster vehicle, ordered by plate
pub fn fleet_overview(vehicles: &[Vehicle], history: &GpsHistory<'_>) -> Vec<VehicleSnapshot> {
    let mut snapshots: Vec<VehicleSnapshot> = vehicles
        .iter()
        .map(|vehicle| {
            let last_fix = history.latest(&vehicle.plate).cloned();
            let status = MovementStatus::from_speed(last_fix.as_ref().and_then(|f| f.speed_kmh));
            VehicleSnapshot { vehicle: vehicle.clone(), last_fix, status }
        })
        .collect();

    snapshots.sort_by(|a, b| a.vehicle.plate.cmp(&b.vehicle.plate));
    snapshots
}

/// Positions of a vehicle, oldest first, skipping unusable fixes
pub fn trajectory(history: &GpsHistory<'_>, plate: &str) -> Vec<Coordinate> {
    history.fixes_for(plate).iter().filter_map(|fix| fix.position()).collect()
}
