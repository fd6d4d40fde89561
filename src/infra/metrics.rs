//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only; do NOT use them for coordination or logic decisions.

use crate::domain::stop::{EnrichedStop, PositionSource};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Exponential bucket boundaries for audit pass latency (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Lock-free metrics collector
pub struct Metrics {
    /// HTTP requests handled (monotonic)
    requests_total: AtomicU64,
    /// HTTP requests answered with a 5xx status (monotonic)
    request_errors_total: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Audit passes run (monotonic)
    audits_total: AtomicU64,
    /// Stops classified across all passes
    stops_total: AtomicU64,
    stops_conforme: AtomicU64,
    stops_non_conforme: AtomicU64,
    /// Stops whose reference came from the declared position
    stops_declared_fallback: AtomicU64,
    /// Stops with no reference position at all
    stops_unavailable: AtomicU64,
    /// POI create/update/delete operations
    poi_mutations_total: AtomicU64,
    /// Audit pass latency histogram (cumulative)
    audit_latency_buckets: [AtomicU64; NUM_BUCKETS],
    audit_latency_sum_us: AtomicU64,
    audit_latency_max_us: AtomicU64,
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            request_errors_total: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            audits_total: AtomicU64::new(0),
            stops_total: AtomicU64::new(0),
            stops_conforme: AtomicU64::new(0),
            stops_non_conforme: AtomicU64::new(0),
            stops_declared_fallback: AtomicU64::new(0),
            stops_unavailable: AtomicU64::new(0),
            poi_mutations_total: AtomicU64::new(0),
            audit_latency_buckets: Default::default(),
            audit_latency_sum_us: AtomicU64::new(0),
            audit_latency_max_us: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_request_error(&self) {
        self.request_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_poi_mutation(&self) {
        self.poi_mutations_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one audit pass and the verdicts it produced
    pub fn record_audit(&self, stops: &[EnrichedStop], latency_us: u64) {
        self.audits_total.fetch_add(1, Ordering::Relaxed);

        let mut conforme = 0u64;
        let mut declared = 0u64;
        let mut unavailable = 0u64;
        for stop in stops {
            if stop.status.is_conforme() {
                conforme += 1;
            }
            match stop.position_source {
                PositionSource::Declared => declared += 1,
                PositionSource::Unavailable => unavailable += 1,
                PositionSource::Gps => {}
            }
        }
        let total = stops.len() as u64;
        self.stops_total.fetch_add(total, Ordering::Relaxed);
        self.stops_conforme.fetch_add(conforme, Ordering::Relaxed);
        self.stops_non_conforme.fetch_add(total - conforme, Ordering::Relaxed);
        self.stops_declared_fallback.fetch_add(declared, Ordering::Relaxed);
        self.stops_unavailable.fetch_add(unavailable, Ordering::Relaxed);

        self.audit_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        self.audit_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.audit_latency_max_us, latency_us);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn audits_total(&self) -> u64 {
        self.audits_total.load(Ordering::Relaxed)
    }

    /// Snapshot counters; only the per-interval request rate resets
    pub fn report(&self) -> MetricsSummary {
        let requests_count = self.requests_since_report.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let audits_total = self.audits_total.load(Ordering::Relaxed);
        let audit_latency_sum = self.audit_latency_sum_us.load(Ordering::Relaxed);
        let audit_latency_avg_us =
            if audits_total > 0 { audit_latency_sum / audits_total } else { 0 };

        MetricsSummary {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            request_errors_total: self.request_errors_total.load(Ordering::Relaxed),
            requests_per_sec,
            audits_total,
            stops_total: self.stops_total.load(Ordering::Relaxed),
            stops_conforme: self.stops_conforme.load(Ordering::Relaxed),
            stops_non_conforme: self.stops_non_conforme.load(Ordering::Relaxed),
            stops_declared_fallback: self.stops_declared_fallback.load(Ordering::Relaxed),
            stops_unavailable: self.stops_unavailable.load(Ordering::Relaxed),
            poi_mutations_total: self.poi_mutations_total.load(Ordering::Relaxed),
            audit_latency_buckets: load_buckets(&self.audit_latency_buckets),
            audit_latency_sum_us: audit_latency_sum,
            audit_latency_avg_us,
            audit_latency_max_us: self.audit_latency_max_us.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of histogram buckets (exported for Prometheus formatting)
pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub requests_total: u64,
    pub request_errors_total: u64,
    pub requests_per_sec: f64,
    pub audits_total: u64,
    pub stops_total: u64,
    pub stops_conforme: u64,
    pub stops_non_conforme: u64,
    pub stops_declared_fallback: u64,
    pub stops_unavailable: u64,
    pub poi_mutations_total: u64,
    /// Bounds: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200 µs
    pub audit_latency_buckets: [u64; NUM_BUCKETS],
    pub audit_latency_sum_us: u64,
    pub audit_latency_avg_us: u64,
    pub audit_latency_max_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            requests_total = %self.requests_total,
            requests_per_sec = format!("{:.2}", self.requests_per_sec),
            request_errors = %self.request_errors_total,
            audits = %self.audits_total,
            stops = %self.stops_total,
            conforme = %self.stops_conforme,
            non_conforme = %self.stops_non_conforme,
            declared_fallback = %self.stops_declared_fallback,
            unavailable = %self.stops_unavailable,
            audit_avg_us = %self.audit_latency_avg_us,
            audit_max_us = %self.audit_latency_max_us,
            "metrics"
        );
    }
}
