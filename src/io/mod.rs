//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `store` - Fleet data source trait and the in-memory JSON store
//! - `api` - JSON row views served to the dashboard
//! - `http` - HTTP API server
//! - `prometheus` - Prometheus text exposition
//! - `report` - Audited stops output to file (JSONL format)

pub mod api;
pub mod http;
pub mod prometheus;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use http::{start_http_server, AppState};
pub use report::ReportWriter;
pub use store::{Dataset, FleetStore, MemoryStore, StoreError, StoreResult};
