//! Stop enrichment: reference position + conformity for each stop
//!
//! Pure over in-memory snapshots. One enriched stop per input stop, in
//! input order. Sorting for display is a separate step.

use crate::domain::stop::{duration_label, EnrichedStop, PositionSource, StopRecord};
use crate::domain::types::{GpsFix, Poi};
use crate::services::conformity::ConformityClassifier;
use crate::services::poi_index::PoiIndex;
use crate::services::position::GpsHistory;
use tracing::debug;

/// Orchestrates aggregation and classification over a batch of stops
#[derive(Debug, Clone, Copy, Default)]
pub struct StopEnricher {
    classifier: ConformityClassifier,
}

impl StopEnricher {
    pub fn new(classifier: ConformityClassifier) -> Self {
        Self { classifier }
    }

    pub fn with_threshold(threshold_m: f64) -> Self {
        Self::new(ConformityClassifier::new(threshold_m))
    }

    pub fn classifier(&self) -> &ConformityClassifier {
        &self.classifier
    }

    /// Enrich a batch of stops against a GPS history and POI snapshot
    pub fn enrich(
        &self,
        stops: &[StopRecord],
        history: &GpsHistory<'_>,
        pois: &[Poi],
    ) -> Vec<EnrichedStop> {
        let index = PoiIndex::new(pois);
        let enriched: Vec<EnrichedStop> =
            stops.iter().map(|stop| self.enrich_one(stop, history, &index)).collect();

        let conforme = enriched.iter().filter(|s| s.status.is_conforme()).count();
        debug!(
            stops = %enriched.len(),
            conforme = %conforme,
            non_conforme = %(enriched.len() - conforme),
            pois = %index.len(),
            threshold_m = %self.classifier.threshold_m(),
            "stops_enriched"
        );

        enriched
    }

    /// Enrich a single stop
    pub fn enrich_one(
        &self,
        stop: &StopRecord,
        history: &GpsHistory<'_>,
        index: &PoiIndex<'_>,
    ) -> EnrichedStop {
        let (reference, source, samples) =
            match history.window_position(&stop.vehicle_id, stop.begin_time, stop.end_time) {
                Some(agg) => (Some(agg.position), PositionSource::Gps, agg.samples),
                None => match stop.declared_position() {
                    Some(pos) => (Some(pos), PositionSource::Declared, 0),
                    None => (None, PositionSource::Unavailable, 0),
                },
            };

        let verdict = self.classifier.classify(reference, index);
        let nearest_poi_distance_m = verdict.measured_distance_m();

        EnrichedStop {
            vehicle_id: stop.vehicle_id.clone(),
            begin_time: stop.begin_time,
            end_time: stop.end_time,
            duration: stop.duration,
            duration_label: duration_label(stop.duration.as_ref()),
            declared_address: stop.declared_address.clone(),
            reference,
            position_source: source,
            gps_samples: samples,
            nearest_poi_name: verdict.nearest_poi_name,
            nearest_poi_distance_m,
            status: verdict.status,
        }
    }
}

/// One-shot enrichment from raw snapshots
pub fn enrich_stops(
    stops: &[StopRecord],
    fixes: &[GpsFix],
    pois: &[Poi],
    threshold_m: f64,
) -> Vec<EnrichedStop> {
    let history = GpsHistory::from_fixes(fixes);
    StopEnricher::with_threshold(threshold_m).enrich(stops, &history, pois)
}

/// Most recent stop first; stops sharing a begin time keep their order
pub fn sort_by_begin_desc(stops: &mut [EnrichedStop]) {
    stops.sort_by(|a, b| b.begin_time.cmp(&a.begin_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::Coordinate;
    use crate::domain::stop::ConformityStatus;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn depot() -> Poi {
        Poi {
            id: 1,
            name: "Dépôt Charguia".to_string(),
            group: Some("Dépôt".to_string()),
            poi_type: "Point".to_string(),
            lat: Some(36.8065),
            lng: Some(10.1815),
            address: None,
        }
    }

    #[test]
    fn test_declared_fallback_when_no_fixes() {
        let stops = vec![StopRecord::new("A", at(8, 0), at(8, 30)).with_declared_position(36.8065, 10.1815)];
        let out = enrich_stops(&stops, &[], &[depot()], 10.0);
        assert_eq!(out[0].position_source, PositionSource::Declared);
        assert_eq!(out[0].gps_samples, 0);
        assert_eq!(out[0].status, ConformityStatus::Conforme);
        assert_eq!(out[0].nearest_poi_distance_m, Some(0.0));
    }

    #[test]
    fn test_gps_wins_over_declared() {
        let stops = vec![StopRecord::new("A", at(8, 0), at(8, 30)).with_declared_position(37.5, 9.5)];
        let fixes = vec![GpsFix::new("A", at(8, 10), 36.8065, 10.1815)];
        let out = enrich_stops(&stops, &fixes, &[depot()], 10.0);
        assert_eq!(out[0].position_source, PositionSource::Gps);
        assert_eq!(out[0].gps_samples, 1);
        assert_eq!(out[0].reference, Some(Coordinate::new(36.8065, 10.1815)));
        assert_eq!(out[0].status, ConformityStatus::Conforme);
    }

    #[test]
    fn test_fixes_outside_window_are_ignored() {
        let stops = vec![StopRecord::new("A", at(8, 0), at(8, 30)).with_declared_position(36.8065, 10.1815)];
        let fixes = vec![GpsFix::new("A", at(9, 0), 40.0, 12.0), GpsFix::new("B", at(8, 10), 40.0, 12.0)];
        let out = enrich_stops(&stops, &fixes, &[depot()], 10.0);
        assert_eq!(out[0].position_source, PositionSource::Declared);
    }

    #[test]
    fn test_unavailable_position_has_no_distance() {
        let stops = vec![StopRecord::new("A", at(8, 0), at(8, 30))];
        let out = enrich_stops(&stops, &[], &[depot()], 10.0);
        assert_eq!(out[0].position_source, PositionSource::Unavailable);
        assert_eq!(out[0].reference, None);
        assert_eq!(out[0].nearest_poi_distance_m, None);
        assert_eq!(out[0].nearest_poi_name, None);
        assert_eq!(out[0].status, ConformityStatus::NonConforme);
    }

    #[test]
    fn test_duration_label_and_address_carried() {
        let stops = vec![
            StopRecord::new("A", at(8, 0), at(9, 25)).with_duration(1, 25).with_address("Route de Bizerte"),
            StopRecord::new("A", at(10, 0), at(10, 5)),
        ];
        let out = enrich_stops(&stops, &[], &[], 10.0);
        assert_eq!(out[0].duration_label, "1h 25min");
        assert_eq!(out[0].declared_address.as_deref(), Some("Route de Bizerte"));
        assert_eq!(out[1].duration_label, "-");
    }

    #[test]
    fn test_sort_by_begin_desc_is_stable() {
        let stops = vec![
            StopRecord::new("A", at(8, 0), at(8, 10)),
            StopRecord::new("B", at(9, 0), at(9, 10)),
            StopRecord::new("C", at(8, 0), at(8, 20)),
        ];
        let mut out = enrich_stops(&stops, &[], &[], 10.0);
        sort_by_begin_desc(&mut out);
        let order: Vec<&str> = out.iter().map(|s| s.vehicle_id.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }
}
