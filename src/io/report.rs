//! Audit report writer
//!
//! Audited stops are appended in JSONL format (one JSON object per line)
//! to the report file named in config. Each line carries the site and the
//! time of the audit pass alongside the enriched stop.

use crate::domain::stop::EnrichedStop;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Serialize)]
struct ReportLine<'a> {
    site: &'a str,
    audited_at: &'a str,
    #[serde(flatten)]
    stop: &'a EnrichedStop,
}

/// JSONL writer for audited stops
pub struct ReportWriter {
    file_path: String,
    site_id: String,
}

impl ReportWriter {
    pub fn new(file_path: &str, site_id: &str) -> Self {
        info!(file_path = %file_path, "report_writer_initialized");
        Self { file_path: file_path.to_string(), site_id: site_id.to_string() }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Append one audited stop
    /// Returns true if successful, false otherwise
    pub fn write_stop(&self, stop: &EnrichedStop, audited_at: &str) -> bool {
        let line = ReportLine { site: &self.site_id, audited_at, stop };
        let result = serde_json::to_string(&line)
            .map_err(std::io::Error::from)
            .and_then(|json| self.append_line(&json));

        match result {
            Ok(()) => {
                debug!(
                    camion = %stop.vehicle_id,
                    status = %stop.status.as_str(),
                    "stop_reported"
                );
                true
            }
            Err(e) => {
                error!(camion = %stop.vehicle_id, error = %e, "stop_report_failed");
                false
            }
        }
    }

    /// Append a batch of audited stops, returning how many were written
    pub fn write_stops(&self, stops: &[EnrichedStop], audited_at: &str) -> usize {
        let written = stops.iter().filter(|stop| self.write_stop(stop, audited_at)).count();
        info!(
            file = %self.file_path,
            written = %written,
            failed = %(stops.len() - written),
            "report_written"
        );
        written
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::Coordinate;
    use crate::domain::stop::{ConformityStatus, PositionSource};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    const AUDITED_AT: &str = "2025-03-02T06:00:00Z";

    fn stop(vehicle: &str, distance: Option<f64>) -> EnrichedStop {
        let begin = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        EnrichedStop {
            vehicle_id: vehicle.to_string(),
            begin_time: begin,
            end_time: begin,
            duration: None,
            duration_label: "-".to_string(),
            declared_address: None,
            reference: distance.map(|_| Coordinate::new(36.8, 10.18)),
            position_source: PositionSource::Gps,
            gps_samples: 2,
            nearest_poi_name: distance.map(|_| "Dépôt".to_string()),
            nearest_poi_distance_m: distance,
            status: match distance {
                Some(d) if d <= 10.0 => ConformityStatus::Conforme,
                _ => ConformityStatus::NonConforme,
            },
        }
    }

    #[test]
    fn test_write_stop() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("audits.jsonl");
        let writer = ReportWriter::new(file_path.to_str().unwrap(), "tunis");

        assert!(writer.write_stop(&stop("120 TDS 4578", Some(4.2)), AUDITED_AT));

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["site"], "tunis");
        assert_eq!(parsed["audited_at"], AUDITED_AT);
        assert_eq!(parsed["vehicle_id"], "120 TDS 4578");
        assert_eq!(parsed["status"], "conforme");
        assert_eq!(parsed["position_source"], "gps");
    }

    #[test]
    fn test_unmeasured_distance_is_null() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("audits.jsonl");
        let writer = ReportWriter::new(file_path.to_str().unwrap(), "tunis");

        writer.write_stop(&stop("88 TU 301", None), AUDITED_AT);

        let content = fs::read_to_string(&file_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert!(parsed["nearest_poi_distance_m"].is_null());
        assert_eq!(parsed["status"], "non_conforme");
    }

    #[test]
    fn test_write_stops_appends() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested").join("audits.jsonl");
        fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        fs::write(&file_path, "{\"existing\":\"data\"}\n").unwrap();

        let writer = ReportWriter::new(file_path.to_str().unwrap(), "tunis");
        let stops = vec![stop("A", Some(1.0)), stop("B", Some(50.0)), stop("C", None)];
        assert_eq!(writer.write_stops(&stops, AUDITED_AT), 3);

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("existing"));
        for line in &lines[1..] {
            let _parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("reports").join("2025").join("audits.jsonl");
        let writer = ReportWriter::new(nested.to_str().unwrap(), "tunis");

        assert!(writer.write_stop(&stop("A", Some(3.0)), AUDITED_AT));
        assert!(nested.exists());
    }
}
