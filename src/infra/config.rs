//! Configuration loading from TOML files
//!
//! The binaries select the file with `--config <path>`, then the
//! CONFIG_FILE environment variable, then config/dev.toml.
//!
//! Every section is optional; missing values fall back to defaults.

use crate::services::conformity::CONFORMITY_THRESHOLD_M;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Marker color for POIs whose group has no configured color
pub const DEFAULT_GROUP_COLOR: &str = "#3b82f6";

/// Status indicator colors
pub const CONFORME_COLOR: &str = "#22c55e";
pub const NON_CONFORME_COLOR: &str = "#ef4444";

/// Built-in POI groups with their legend colors
const DEFAULT_POI_GROUPS: [(&str, &str); 5] = [
    ("Dépôt", "#fbbf24"),
    ("Client Interne", "#f97316"),
    ("Client Externe", "#ef4444"),
    ("Station", "#a855f7"),
    ("Zone Industrielle", "#06b6d4"),
];

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Fleet operator identifier used as metrics label
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "fleet".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    5000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_address: default_bind_address(), port: default_http_port() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// JSON dataset with vehicles, GPS history, stops and POIs
    #[serde(default = "default_data_file")]
    pub file: String,
}

fn default_data_file() -> String {
    "data/fleet.json".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { file: default_data_file() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Maximum stop-to-POI distance counted as conforme (meters)
    #[serde(default = "default_threshold_m")]
    pub threshold_m: f64,
}

fn default_threshold_m() -> f64 {
    CONFORMITY_THRESHOLD_M
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { threshold_m: default_threshold_m() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Interval between metrics log lines (0 to disable)
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// File path for audit reports (JSONL format)
    #[serde(default = "default_report_file")]
    pub file: String,
}

fn default_report_file() -> String {
    "audits.jsonl".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { file: default_report_file() }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PoiGroupConfig {
    pub name: String,
    pub color: String,
}

fn default_poi_groups() -> Vec<PoiGroupConfig> {
    DEFAULT_POI_GROUPS
        .iter()
        .map(|(name, color)| PoiGroupConfig { name: name.to_string(), color: color.to_string() })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub poi_groups: Option<Vec<PoiGroupConfig>>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    http_bind_address: String,
    http_port: u16,
    data_file: String,
    threshold_m: f64,
    metrics_interval_secs: u64,
    report_file: String,
    poi_groups: Vec<PoiGroupConfig>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            http_bind_address: default_bind_address(),
            http_port: default_http_port(),
            data_file: default_data_file(),
            threshold_m: CONFORMITY_THRESHOLD_M,
            metrics_interval_secs: default_metrics_interval(),
            report_file: default_report_file(),
            poi_groups: default_poi_groups(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let threshold_m = toml_config.audit.threshold_m;
        if !threshold_m.is_finite() || threshold_m < 0.0 {
            anyhow::bail!(
                "Invalid audit.threshold_m {} in {}: must be a non-negative number",
                threshold_m,
                path.display()
            );
        }

        Ok(Self {
            site_id: toml_config.site.id,
            http_bind_address: toml_config.http.bind_address,
            http_port: toml_config.http.port,
            data_file: toml_config.data.file,
            threshold_m,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            report_file: toml_config.report.file,
            poi_groups: toml_config.poi_groups.unwrap_or_else(default_poi_groups),
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from `path`, using defaults only when the file
    /// does not exist. A file that exists but fails to parse or validate is
    /// an error.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            tracing::warn!(path = %path, "config_file_missing_using_defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Legend color of a POI group
    pub fn group_color(&self, group: Option<&str>) -> &str {
        group
            .and_then(|name| self.poi_groups.iter().find(|g| g.name == name))
            .map_or(DEFAULT_GROUP_COLOR, |g| g.color.as_str())
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn http_bind_address(&self) -> &str {
        &self.http_bind_address
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn data_file(&self) -> &str {
        &self.data_file
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn report_file(&self) -> &str {
        &self.report_file
    }

    pub fn poi_groups(&self) -> &[PoiGroupConfig] {
        &self.poi_groups
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for overriding the data file (CLI flag, tests)
    pub fn with_data_file(mut self, file: &str) -> Self {
        self.data_file = file.to_string();
        self
    }

    /// Builder method for overriding the conformity threshold
    pub fn with_threshold_m(mut self, threshold_m: f64) -> Self {
        self.threshold_m = threshold_m;
        self
    }
}
