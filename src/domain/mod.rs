//! Domain models - fleet records and the audited stop
//!
//! This module contains the canonical data types used throughout the system:
//! - `geo` - Coordinates and Haversine distance
//! - `types` - GPS fixes, vehicles, points of interest
//! - `stop` - Stop records, conformity status, enriched stops

pub mod geo;
pub mod stop;
pub mod types;

// Re-export commonly used types at module level
pub use geo::{distance_meters, Coordinate};
pub use stop::{ConformityStatus, EnrichedStop, PositionSource, StopDuration, StopRecord};
pub use types::{GpsFix, Poi, PoiDraft, Vehicle, VehicleKey};
