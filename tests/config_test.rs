//! Integration tests for configuration loading

use fleet_audit::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r##"
[site]
id = "tunis"

[http]
bind_address = "127.0.0.1"
port = 8080

[data]
file = "/var/lib/fleet/fleet.json"

[audit]
threshold_m = 25.0

[metrics]
interval_secs = 15

[report]
file = "/var/log/fleet/audits.jsonl"

[[poi_groups]]
name = "Dépôt"
color = "#000000"

[[poi_groups]]
name = "Parking"
color = "#123456"
"##;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "tunis");
    assert_eq!(config.http_bind_address(), "127.0.0.1");
    assert_eq!(config.http_port(), 8080);
    assert_eq!(config.data_file(), "/var/lib/fleet/fleet.json");
    assert_eq!(config.threshold_m(), 25.0);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert_eq!(config.report_file(), "/var/log/fleet/audits.jsonl");
    assert_eq!(config.poi_groups().len(), 2);
    assert_eq!(config.group_color(Some("Parking")), "#123456");
    assert_eq!(config.group_color(Some("Station")), "#3b82f6");
}

#[test]
fn test_partial_config_uses_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[site]\nid = \"sfax\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.site_id(), "sfax");
    assert_eq!(config.http_port(), 5000);
    assert_eq!(config.threshold_m(), 10.0);
    assert_eq!(config.poi_groups().len(), 5);
    assert_eq!(config.group_color(Some("Station")), "#a855f7");
}

#[test]
fn test_negative_threshold_rejected() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[audit]\nthreshold_m = -1.0\n").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}

#[test]
fn test_load_from_path_fallback() {
    let config = Config::load_from_path("/nonexistent/config.toml").unwrap();
    assert_eq!(config.site_id(), "fleet");
    assert_eq!(config.http_port(), 5000);
    assert_eq!(config.threshold_m(), 10.0);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_load_from_path_rejects_invalid_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[http]\nport = 8080\n\n[audit]\nthreshold_m = -5.0\n").unwrap();
    temp_file.flush().unwrap();
    assert!(Config::load_from_path(temp_file.path().to_str().unwrap()).is_err());

    let mut broken = NamedTempFile::new().unwrap();
    broken.write_all(b"[http\nport = ").unwrap();
    broken.flush().unwrap();
    assert!(Config::load_from_path(broken.path().to_str().unwrap()).is_err());
}
