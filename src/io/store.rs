//! Fleet data source
//!
//! `FleetStore` is the seam between the audit core and persistent storage.
//! `MemoryStore` implements it over a JSON dataset loaded at startup, with
//! POI edits applied in memory.

use crate::domain::stop::StopRecord;
use crate::domain::types::{GpsFix, Poi, PoiDraft, Vehicle, VehicleKey};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Errors surfaced by a fleet data source
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No record with the requested id
    NotFound { id: i64 },
    /// Rejected input
    Invalid(String),
    /// Backend could not serve the request
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { id } => write!(f, "record {id} not found"),
            StoreError::Invalid(reason) => write!(f, "invalid input: {reason}"),
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to fleet data plus POI maintenance
#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn vehicles(&self) -> StoreResult<Vec<Vehicle>>;

    async fn gps_fixes(&self) -> StoreResult<Vec<GpsFix>>;

    /// Fixes of one vehicle (plate matched ignoring whitespace)
    async fn gps_fixes_for(&self, plate: &str) -> StoreResult<Vec<GpsFix>>;

    async fn stops(&self) -> StoreResult<Vec<StopRecord>>;

    /// POIs ordered by name
    async fn pois(&self) -> StoreResult<Vec<Poi>>;

    async fn create_poi(&self, draft: PoiDraft) -> StoreResult<Poi>;

    async fn update_poi(&self, id: i64, draft: PoiDraft) -> StoreResult<Poi>;

    async fn delete_poi(&self, id: i64) -> StoreResult<()>;
}

/// Serialized form of the whole fleet dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub gps: Vec<GpsFix>,
    #[serde(default)]
    pub stops: Vec<StopRecord>,
    #[serde(default)]
    pub pois: Vec<Poi>,
}

impl Dataset {
    /// Load a dataset from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;

        info!(
            file = %path.display(),
            vehicles = %dataset.vehicles.len(),
            gps_fixes = %dataset.gps.len(),
            stops = %dataset.stops.len(),
            pois = %dataset.pois.len(),
            "dataset_loaded"
        );
        Ok(dataset)
    }
}

fn check_draft(draft: &PoiDraft) -> StoreResult<()> {
    match draft.validation_error() {
        Some(reason) => Err(StoreError::Invalid(reason.to_string())),
        None => Ok(()),
    }
}

/// In-memory store over a dataset snapshot
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self { data: RwLock::new(dataset) }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self::new(Dataset::from_file(path)?))
    }

    fn next_poi_id(data: &Dataset) -> i64 {
        data.pois.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        Ok(self.data.read().vehicles.clone())
    }

    async fn gps_fixes(&self) -> StoreResult<Vec<GpsFix>> {
        Ok(self.data.read().gps.clone())
    }

    async fn gps_fixes_for(&self, plate: &str) -> StoreResult<Vec<GpsFix>> {
        let key = VehicleKey::new(plate);
        Ok(self
            .data
            .read()
            .gps
            .iter()
            .filter(|fix| VehicleKey::new(&fix.vehicle_id) == key)
            .cloned()
            .collect())
    }

    async fn stops(&self) -> StoreResult<Vec<StopRecord>> {
        Ok(self.data.read().stops.clone())
    }

    async fn pois(&self) -> StoreResult<Vec<Poi>> {
        let mut pois = self.data.read().pois.clone();
        pois.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pois)
    }

    async fn create_poi(&self, draft: PoiDraft) -> StoreResult<Poi> {
        check_draft(&draft)?;
        let mut data = self.data.write();
        let poi = draft.into_poi(Self::next_poi_id(&data));
        data.pois.push(poi.clone());
        debug!(id = %poi.id, name = %poi.name, "poi_created");
        Ok(poi)
    }

    async fn update_poi(&self, id: i64, draft: PoiDraft) -> StoreResult<Poi> {
        check_draft(&draft)?;
        let mut data = self.data.write();
        let slot = data.pois.iter_mut().find(|p| p.id == id).ok_or(StoreError::NotFound { id })?;
        *slot = draft.into_poi(id);
        debug!(id = %id, name = %slot.name, "poi_updated");
        Ok(slot.clone())
    }

    async fn delete_poi(&self, id: i64) -> StoreResult<()> {
        let mut data = self.data.write();
        let before = data.pois.len();
        data.pois.retain(|p| p.id != id);
        if data.pois.len() == before {
            return Err(StoreError::NotFound { id });
        }
        debug!(id = %id, "poi_deleted");
        Ok(())
    }
}
