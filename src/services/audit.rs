//! Stop audit passes, filtering and summary counts

use crate::domain::stop::{ConformityStatus, EnrichedStop};
use crate::infra::metrics::Metrics;
use crate::io::store::{FleetStore, StoreResult};
use crate::services::position::GpsHistory;
use crate::services::stop_enricher::{sort_by_begin_desc, StopEnricher};
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Fetch fresh snapshots and audit every stop, most recent first
pub async fn run_audit(
    store: &dyn FleetStore,
    enricher: &StopEnricher,
    metrics: Option<&Metrics>,
) -> StoreResult<Vec<EnrichedStop>> {
    let (stops, fixes, pois) = tokio::try_join!(store.stops(), store.gps_fixes(), store.pois())?;

    let started = Instant::now();
    let history = GpsHistory::from_fixes(&fixes);
    let mut enriched = enricher.enrich(&stops, &history, &pois);
    sort_by_begin_desc(&mut enriched);
    let latency_us = started.elapsed().as_micros() as u64;

    if let Some(metrics) = metrics {
        metrics.record_audit(&enriched, latency_us);
    }

    let summary = AuditSummary::from_stops(&enriched);
    info!(
        stops = %summary.total,
        conforme = %summary.conforme,
        non_conforme = %summary.non_conforme,
        gps_vehicles = %history.vehicle_count(),
        pois = %pois.len(),
        latency_us = %latency_us,
        "audit_completed"
    );

    Ok(enriched)
}

/// Criteria for narrowing an audited stop list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopFilter {
    /// Earliest begin date (inclusive)
    pub from: Option<NaiveDate>,
    /// Latest begin date (inclusive)
    pub to: Option<NaiveDate>,
    pub status: Option<ConformityStatus>,
    /// Plate fragment, matched ignoring whitespace and case
    pub plate: Option<String>,
}

fn plate_needle(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

impl StopFilter {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none() && self.status.is_none() && self.plate.is_none()
    }

    pub fn matches(&self, stop: &EnrichedStop) -> bool {
        let day = stop.begin_time.date();
        if self.from.is_some_and(|from| day < from) {
            return false;
        }
        if self.to.is_some_and(|to| day > to) {
            return false;
        }
        if self.status.is_some_and(|status| stop.status != status) {
            return false;
        }
        if let Some(plate) = &self.plate {
            let needle = plate_needle(plate);
            if !needle.is_empty() && !plate_needle(&stop.vehicle_id).contains(&needle) {
                return false;
            }
        }
        true
    }

    /// Keep matching stops, preserving order
    pub fn apply(&self, stops: Vec<EnrichedStop>) -> Vec<EnrichedStop> {
        if self.is_empty() {
            return stops;
        }
        stops.into_iter().filter(|s| self.matches(s)).collect()
    }
}

/// Conformity counts over a stop list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub conforme: usize,
    pub non_conforme: usize,
}

impl AuditSummary {
    pub fn from_stops(stops: &[EnrichedStop]) -> Self {
        let conforme = stops.iter().filter(|s| s.status.is_conforme()).count();
        Self { total: stops.len(), conforme, non_conforme: stops.len() - conforme }
    }

    /// Share of conforming stops in percent, 0 for an empty list
    pub fn conformity_rate_pct(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.conforme as f64 * 100.0 / self.total as f64
    }
}
