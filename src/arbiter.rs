//! Physical-vs-virtual strategy arbitration.
//!
//! A pass selects exactly one strategy for an event; a single pass never
//! materializes both kinds. Physical gates win only when there is both
//! genuine spatial separation and sufficient confidence — ambiguous or
//! single-location venues get virtual gates, which is a valid outcome, not a
//! fallback.

use crate::{AdaptiveThresholds, GateCandidate, GateStrategy};
use log::debug;

/// Choose the event's strategy for this pass.
///
/// Physical requires ALL of:
/// 1. at least two physical candidates
/// 2. spatial extent of the quality samples (maximum pairwise distance)
///    above `max_location_variance_meters` (otherwise everything is one
///    place)
/// 3. the best physical candidate's confidence at or above
///    `confidence_threshold`
///
/// Anything else is virtual.
pub fn choose_strategy(
    physical: &[GateCandidate],
    sample_extent_meters: f64,
    thresholds: &AdaptiveThresholds,
) -> GateStrategy {
    if physical.len() < 2 {
        debug!(
            "arbiter: {} physical candidate(s), need 2 -> virtual",
            physical.len()
        );
        return GateStrategy::Virtual;
    }

    if sample_extent_meters <= thresholds.max_location_variance_meters {
        debug!(
            "arbiter: sample extent {:.1}m within variance bound {:.1}m -> virtual",
            sample_extent_meters, thresholds.max_location_variance_meters
        );
        return GateStrategy::Virtual;
    }

    let best_confidence = physical
        .iter()
        .map(|c| c.confidence)
        .fold(0.0_f64, f64::max);
    if best_confidence < thresholds.confidence_threshold {
        debug!(
            "arbiter: best physical confidence {:.2} below threshold {:.2} -> virtual",
            best_confidence, thresholds.confidence_threshold
        );
        return GateStrategy::Virtual;
    }

    GateStrategy::Physical
}
