//! GPS quality filtering and statistical outlier rejection.
//!
//! Raw check-ins carry noisy, sometimes absurd location claims: sentinel
//! (0,0) coordinates, out-of-range values, missing or hopeless accuracy.
//! Everything downstream of this module operates on [`QualitySample`]s that
//! survived the filter.

use crate::geo_utils::{compute_centroid, distance_stats, haversine_distance};
use crate::{CheckinEvent, GeoPoint, GpsSample};
use serde::{Deserialize, Serialize};

/// Accuracy ceiling (meters) above which a sample is rejected outright.
pub const ACCURACY_REJECTION_CEILING: f64 = 100.0;

/// Minimum sample count for a meaningful standard deviation; below this,
/// outlier rejection is skipped.
const MIN_SAMPLES_FOR_OUTLIER_REJECTION: usize = 4;

/// Reported-accuracy band of a GPS sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyBand {
    /// <= 15 meters
    High,
    /// <= 30 meters
    Good,
    /// <= 50 meters
    Fair,
    /// > 50 meters, or invalid
    Rejected,
}

impl AccuracyBand {
    /// Classify a reported accuracy radius in meters.
    pub fn classify(accuracy_meters: f64) -> Self {
        if !accuracy_meters.is_finite() || accuracy_meters < 0.0 {
            Self::Rejected
        } else if accuracy_meters <= 15.0 {
            Self::High
        } else if accuracy_meters <= 30.0 {
            Self::Good
        } else if accuracy_meters <= 50.0 {
            Self::Fair
        } else {
            Self::Rejected
        }
    }

    /// Whether samples in this band are usable for clustering.
    pub fn is_usable(&self) -> bool {
        *self != Self::Rejected
    }
}

/// Validate a raw location claim.
///
/// Rejects when:
/// - latitude outside [-90, 90] or longitude outside [-180, 180]
/// - accuracy missing or above [`ACCURACY_REJECTION_CEILING`]
/// - coordinates equal to (0, 0) — "null island", a common failure sentinel
pub fn is_valid_gps(sample: &GpsSample) -> bool {
    if !sample.point().is_in_range() {
        return false;
    }
    if sample.latitude == 0.0 && sample.longitude == 0.0 {
        return false;
    }
    match sample.accuracy {
        Some(acc) => acc.is_finite() && acc > 0.0 && acc <= ACCURACY_REJECTION_CEILING,
        None => false,
    }
}

/// A check-in's location claim that passed the quality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySample {
    pub checkin_id: String,
    pub category: String,
    pub timestamp: i64,
    pub point: GeoPoint,
    /// Reported accuracy radius in meters
    pub accuracy: f64,
    pub band: AccuracyBand,
}

/// Extract the usable GPS samples from a batch of check-ins.
///
/// Check-ins without GPS, or with claims failing [`is_valid_gps`], or falling
/// in the `Rejected` band are dropped here (they remain in the check-in set
/// for virtual derivation and orphan accounting).
pub fn filter_quality(checkins: &[CheckinEvent]) -> Vec<QualitySample> {
    checkins
        .iter()
        .filter_map(|checkin| {
            let gps = checkin.gps.as_ref()?;
            if !is_valid_gps(gps) {
                return None;
            }
            let accuracy = gps.accuracy?;
            let band = AccuracyBand::classify(accuracy);
            if !band.is_usable() {
                return None;
            }
            Some(QualitySample {
                checkin_id: checkin.id.clone(),
                category: checkin.category.clone(),
                timestamp: checkin.timestamp,
                point: gps.point(),
                accuracy,
                band,
            })
        })
        .collect()
}

/// Remove statistical spatial outliers from a candidate region.
///
/// Computes the centroid and the standard deviation of member distances from
/// it, then discards members whose distance exceeds three standard deviations
/// from the mean distance. Runs per-candidate, after coarse grouping, before
/// final statistics.
///
/// Fewer than four samples: returned unchanged (insufficient data for a
/// meaningful standard deviation).
pub fn reject_outliers(samples: Vec<QualitySample>) -> Vec<QualitySample> {
    if samples.len() < MIN_SAMPLES_FOR_OUTLIER_REJECTION {
        return samples;
    }

    let points: Vec<GeoPoint> = samples.iter().map(|s| s.point).collect();
    let centroid = compute_centroid(&points);
    let stats = distance_stats(&points, &centroid);

    // Degenerate spread (all points coincident): nothing to reject.
    if stats.std_dev == 0.0 {
        return samples;
    }

    let cutoff = stats.mean + 3.0 * stats.std_dev;

    samples
        .into_iter()
        .filter(|s| haversine_distance(&s.point, &centroid) <= cutoff)
        .collect()
}
