//! Prometheus text exposition of audit metrics
//!
//! Served at /metrics by the HTTP API.

use crate::infra::metrics::{Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {cumulative}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_request_metrics(&mut output, site_id, &summary);
    write_audit_metrics(&mut output, site_id, &summary);

    output
}

fn write_request_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "fleet_http_requests_total",
        "Total HTTP requests handled",
        MetricType::Counter,
        site,
        summary.requests_total,
    );
    write_metric(
        output,
        "fleet_http_errors_total",
        "HTTP requests answered with a server error",
        MetricType::Counter,
        site,
        summary.request_errors_total,
    );
    write_metric(
        output,
        "fleet_poi_mutations_total",
        "POI create, update and delete operations",
        MetricType::Counter,
        site,
        summary.poi_mutations_total,
    );
}

fn write_audit_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "fleet_audits_total",
        "Stop audit passes run",
        MetricType::Counter,
        site,
        summary.audits_total,
    );
    write_metric(
        output,
        "fleet_stops_audited_total",
        "Stops classified across all audit passes",
        MetricType::Counter,
        site,
        summary.stops_total,
    );
    write_metric(
        output,
        "fleet_stops_conforme_total",
        "Stops within the threshold of a POI",
        MetricType::Counter,
        site,
        summary.stops_conforme,
    );
    write_metric(
        output,
        "fleet_stops_non_conforme_total",
        "Stops away from every POI or unmeasurable",
        MetricType::Counter,
        site,
        summary.stops_non_conforme,
    );
    write_metric(
        output,
        "fleet_stops_declared_fallback_total",
        "Stops positioned from the declared coordinates",
        MetricType::Counter,
        site,
        summary.stops_declared_fallback,
    );
    write_metric(
        output,
        "fleet_stops_position_unavailable_total",
        "Stops with no usable position",
        MetricType::Counter,
        site,
        summary.stops_unavailable,
    );
    write_histogram(
        output,
        "fleet_audit_latency_us",
        "Audit pass duration in microseconds",
        site,
        &summary.audit_latency_buckets,
        summary.audit_latency_sum_us,
    );
    write_metric(
        output,
        "fleet_audit_latency_max_us",
        "Longest audit pass",
        MetricType::Gauge,
        site,
        summary.audit_latency_max_us,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_request();
        metrics.record_audit(&[], 250);

        let output = format_prometheus_metrics(&metrics, "tunis");

        assert!(output.contains("fleet_http_requests_total{site=\"tunis\"} 1"));
        assert!(output.contains("fleet_audits_total{site=\"tunis\"} 1"));
        assert!(output.contains("fleet_audit_latency_us_bucket{site=\"tunis\",le=\"400\"} 1"));
        assert!(output.contains("fleet_audit_latency_us_bucket{site=\"tunis\",le=\"+Inf\"} 1"));
        assert!(output.contains("fleet_audit_latency_us_sum{site=\"tunis\"} 250"));
        assert!(output.contains("# TYPE fleet_audit_latency_max_us gauge"));
    }
}
