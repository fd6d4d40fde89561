//! Stop conformity classification
//!
//! A stop is `conforme` when its reference position lies within the
//! threshold of the nearest POI (closed interval). Anything unmeasurable
//! (no position, no POI) is `non_conforme`.

use crate::domain::geo::Coordinate;
use crate::domain::stop::ConformityStatus;
use crate::services::poi_index::PoiIndex;

/// Maximum distance to a POI for a stop to count as authorized (meters)
pub const CONFORMITY_THRESHOLD_M: f64 = 10.0;

/// Verdict for one reference position
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub nearest_poi_name: Option<String>,
    /// `f64::INFINITY` when nothing could be measured
    pub distance_m: f64,
    pub status: ConformityStatus,
}

impl Classification {
    /// Finite distance, `None` for the "unavailable" case
    pub fn measured_distance_m(&self) -> Option<f64> {
        self.distance_m.is_finite().then_some(self.distance_m)
    }
}

/// Threshold classifier over a POI snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConformityClassifier {
    threshold_m: f64,
}

impl Default for ConformityClassifier {
    fn default() -> Self {
        Self { threshold_m: CONFORMITY_THRESHOLD_M }
    }
}

impl ConformityClassifier {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Status for a measured distance; infinite or NaN never conforms
    #[inline]
    pub fn status_for(&self, distance_m: f64) -> ConformityStatus {
        if distance_m <= self.threshold_m {
            ConformityStatus::Conforme
        } else {
            ConformityStatus::NonConforme
        }
    }

    /// Classify a reference position against the nearest POI
    pub fn classify(&self, reference: Option<Coordinate>, index: &PoiIndex<'_>) -> Classification {
        let Some(reference) = reference else {
            return Classification {
                nearest_poi_name: None,
                distance_m: f64::INFINITY,
                status: ConformityStatus::NonConforme,
            };
        };

        let nearest = index.nearest(reference);
        Classification {
            nearest_poi_name: nearest.name().map(str::to_string),
            distance_m: nearest.distance_m,
            status: self.status_for(nearest.distance_m),
        }
    }
}
