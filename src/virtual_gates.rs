//! Virtual gate derivation.
//!
//! Builds one candidate per attendee category observed in the event's
//! check-ins, regardless of location. Always computable — never blocked by
//! missing GPS — which makes it the strategy of record for indoor venues,
//! sparse events, and anything the physical pipeline cannot support with
//! confidence.

use crate::confidence::score_virtual;
use crate::quality::is_valid_gps;
use crate::{AdaptiveThresholds, CheckinEvent, DiscoveryConfig, GateCandidate, GateKind};
use std::collections::HashMap;

/// Build one scored virtual candidate per category.
///
/// Output is ordered by category name for deterministic materialization.
pub fn virtual_candidates(
    checkins: &[CheckinEvent],
    thresholds: &AdaptiveThresholds,
    config: &DiscoveryConfig,
) -> Vec<GateCandidate> {
    let mut by_category: HashMap<&str, Vec<&CheckinEvent>> = HashMap::new();
    for checkin in checkins {
        by_category.entry(checkin.category.as_str()).or_default().push(checkin);
    }

    let mut categories: Vec<&str> = by_category.keys().copied().collect();
    categories.sort_unstable();

    categories
        .into_iter()
        .map(|category| {
            let members = &by_category[category];

            let first_seen = members.iter().map(|c| c.timestamp).min().unwrap_or(0);
            let last_seen = members.iter().map(|c| c.timestamp).max().unwrap_or(0);

            // Accuracy statistics only over members that carried usable GPS.
            let accuracies: Vec<f64> = members
                .iter()
                .filter_map(|c| c.gps.as_ref())
                .filter(|gps| is_valid_gps(gps))
                .filter_map(|gps| gps.accuracy)
                .collect();
            let accuracy_mean = if accuracies.is_empty() {
                None
            } else {
                Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
            };

            let confidence = score_virtual(
                members.len(),
                accuracy_mean,
                last_seen - first_seen,
                thresholds,
                config,
            );

            let mut distribution = HashMap::new();
            distribution.insert(category.to_string(), members.len());

            GateCandidate {
                kind: GateKind::Virtual,
                centroid: None,
                member_ids: members.iter().map(|c| c.id.clone()).collect(),
                member_count: members.len(),
                categories: distribution,
                accuracy_mean,
                accuracy_spread: None,
                first_seen,
                last_seen,
                confidence,
                method: "category".to_string(),
            }
        })
        .collect()
}
