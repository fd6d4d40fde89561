//! Fleet audit report - one-shot stop conformity audit
//!
//! Audits every stop of a fleet dataset and prints a table, optionally
//! appending the audited stops to a JSONL report file.
//!
//! Usage:
//!   fleet-audit-report --config config/dev.toml
//!   fleet-audit-report --data data/fleet.json --status non_conforme --jsonl
//!   fleet-audit-report --camion "120 TDS" --from 2025-03-01 --to 2025-03-31

use chrono::NaiveDate;
use clap::Parser;
use fleet_audit::domain::stop::{ConformityStatus, EnrichedStop};
use fleet_audit::infra::{Config, Metrics};
use fleet_audit::io::api::{format_minute, DISTANCE_UNAVAILABLE};
use fleet_audit::io::{MemoryStore, ReportWriter};
use fleet_audit::services::{run_audit, AuditSummary, StopEnricher, StopFilter};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Fleet audit report - classify stops against known POIs
#[derive(Parser, Debug)]
#[command(name = "fleet-audit-report", version, about, long_about = None)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,

    /// Fleet dataset (JSON), overrides data.file
    #[arg(short, long)]
    data: Option<String>,

    /// Conformity threshold in meters, overrides audit.threshold_m
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Only stops with this status ("conforme" or "non_conforme")
    #[arg(short, long)]
    status: Option<ConformityStatus>,

    /// Only stops of plates containing this fragment (whitespace and case ignored)
    #[arg(long)]
    camion: Option<String>,

    /// Earliest stop date, YYYY-MM-DD
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest stop date, YYYY-MM-DD
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Append audited stops to the JSONL report file
    #[arg(long)]
    jsonl: bool,

    /// Report file, overrides report.file
    #[arg(short, long)]
    output: Option<String>,
}

fn print_table(stops: &[EnrichedStop], summary: &AuditSummary, threshold_m: f64) {
    println!(
        "{:<16} {:<17} {:<10} {:<28} {:>12}  STATUS",
        "CAMION", "DEBUT", "DUREE", "POI", "DISTANCE"
    );
    for stop in stops {
        let distance = match stop.nearest_poi_distance_m {
            Some(d) => format!("{} m", d.round() as i64),
            None => DISTANCE_UNAVAILABLE.to_string(),
        };
        println!(
            "{:<16} {:<17} {:<10} {:<28} {:>12}  {}",
            stop.vehicle_id,
            format_minute(&stop.begin_time),
            stop.duration_label,
            stop.nearest_poi_name.as_deref().unwrap_or("-"),
            distance,
            stop.status.as_str()
        );
    }
    println!();
    println!(
        "{} stops, {} conforme, {} non conforme ({:.1}% within {} m)",
        summary.total,
        summary.conforme,
        summary.non_conforme,
        summary.conformity_rate_pct(),
        threshold_m
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the table stays clean on stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config)?;
    if let Some(data) = &args.data {
        config = config.with_data_file(data);
    }
    if let Some(threshold) = args.threshold {
        anyhow::ensure!(
            threshold.is_finite() && threshold >= 0.0,
            "threshold must be a non-negative number, got {threshold}"
        );
        config = config.with_threshold_m(threshold);
    }

    let store = MemoryStore::from_file(config.data_file())?;
    let enricher = StopEnricher::with_threshold(config.threshold_m());
    let metrics = Metrics::new();

    let started = Instant::now();
    let stops = run_audit(&store, &enricher, Some(&metrics)).await?;

    let filter = StopFilter { from: args.from, to: args.to, status: args.status, plate: args.camion };
    let stops = filter.apply(stops);
    let summary = AuditSummary::from_stops(&stops);

    print_table(&stops, &summary, config.threshold_m());

    if args.jsonl {
        let file = args.output.as_deref().unwrap_or(config.report_file());
        let writer = ReportWriter::new(file, config.site_id());
        let audited_at = chrono::Utc::now().to_rfc3339();
        let written = writer.write_stops(&stops, &audited_at);
        anyhow::ensure!(
            written == stops.len(),
            "only {written} of {} stops written to {file}",
            stops.len()
        );
    }

    info!(
        stops = %summary.total,
        conforme = %summary.conforme,
        elapsed_ms = %started.elapsed().as_millis(),
        "report_complete"
    );
    Ok(())
}
