//! Fleet audit server - stop conformity API for the fleet dashboard
//!
//! Loads a fleet dataset, audits every truck stop against the known points
//! of interest and serves the results over HTTP.
//!
//! Module structure:
//! - `domain/` - Core types (GpsFix, Poi, StopRecord, EnrichedStop)
//! - `services/` - Audit logic (position, nearest POI, conformity)
//! - `io/` - External interfaces (store, HTTP API, Prometheus, report)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use fleet_audit::infra::{Config, Metrics};
use fleet_audit::io::{start_http_server, AppState, MemoryStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Fleet audit - truck stop conformity server
#[derive(Parser, Debug)]
#[command(name = "fleet-audit", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,

    /// Fleet dataset (JSON), overrides data.file
    #[arg(short, long)]
    data: Option<String>,

    /// Listen port, overrides http.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // RUST_LOG overrides the default INFO level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = %env!("GIT_HASH"), "fleet-audit starting");

    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config)?;
    if let Some(data) = &args.data {
        config = config.with_data_file(data);
    }
    let port = args.port.unwrap_or_else(|| config.http_port());

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        data_file = %config.data_file(),
        threshold_m = %config.threshold_m(),
        http_port = %port,
        poi_groups = %config.poi_groups().len(),
        "config_loaded"
    );

    let store = match MemoryStore::from_file(config.data_file()) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %format!("{e:#}"), "dataset_load_failed");
            return Err(e.into());
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.http_bind_address(), port).parse()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    // Periodic metrics log (0 disables)
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
            loop {
                interval.tick().await;
                metrics_clone.report().log();
            }
        });
    }

    let state = Arc::new(AppState::new(Arc::new(store), config, metrics));

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    start_http_server(addr, state, shutdown_rx).await?;

    info!("fleet-audit shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_selection() {
        std::env::remove_var("CONFIG_FILE");
        let args = Args::try_parse_from(["fleet-audit"]).unwrap();
        assert_eq!(args.config, "config/dev.toml");

        std::env::set_var("CONFIG_FILE", "config/sfax.toml");
        let args = Args::try_parse_from(["fleet-audit"]).unwrap();
        assert_eq!(args.config, "config/sfax.toml");

        let args = Args::try_parse_from(["fleet-audit", "--config", "config/prod.toml"]).unwrap();
        assert_eq!(args.config, "config/prod.toml");
        std::env::remove_var("CONFIG_FILE");
    }
}
