//! Services - audit logic over fleet snapshots
//!
//! This module contains the core business logic services:
//! - `position` - Per-vehicle GPS history and stop-window mean position
//! - `poi_index` - Nearest point of interest lookup
//! - `conformity` - Distance threshold verdict
//! - `stop_enricher` - Reference position and verdict for each stop
//! - `audit` - Store-backed audit pass, filtering and summary counts
//! - `fleet` - Latest position and movement status per vehicle

pub mod audit;
pub mod conformity;
pub mod fleet;
pub mod poi_index;
pub mod position;
pub mod stop_enricher;

// Re-export commonly used types
pub use audit::{run_audit, AuditSummary, StopFilter};
pub use conformity::ConformityClassifier;
pub use poi_index::PoiIndex;
pub use position::GpsHistory;
pub use stop_enricher::StopEnricher;
