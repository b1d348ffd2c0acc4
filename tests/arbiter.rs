//! Tests for the physical-vs-virtual decision arbiter

use gatefind::{choose_strategy, AdaptiveThresholds, GateCandidate, GateKind, GateStrategy, GeoPoint};
use std::collections::HashMap;

fn candidate(confidence: f64, lat: f64) -> GateCandidate {
    let mut categories = HashMap::new();
    categories.insert("general".to_string(), 20);
    GateCandidate {
        kind: GateKind::Physical,
        centroid: Some(GeoPoint::new(lat, 8.55)),
        member_ids: (0..20).map(|i| format!("chk-{i}")).collect(),
        member_count: 20,
        categories,
        accuracy_mean: Some(10.0),
        accuracy_spread: Some(0.0),
        first_seen: 1_700_000_000,
        last_seen: 1_700_007_200,
        confidence,
        method: "spatial_cluster".to_string(),
    }
}

#[test]
fn test_two_confident_separated_candidates_select_physical() {
    let candidates = vec![candidate(0.9, 47.370), candidate(0.85, 47.372)];
    // Samples spread across ~200m, far above the 15m variance bound
    let strategy = choose_strategy(&candidates, 100.0, &AdaptiveThresholds::default());
    assert_eq!(strategy, GateStrategy::Physical);
}

#[test]
fn test_single_candidate_selects_virtual() {
    let candidates = vec![candidate(0.95, 47.370)];
    let strategy = choose_strategy(&candidates, 100.0, &AdaptiveThresholds::default());
    assert_eq!(strategy, GateStrategy::Virtual);
}

#[test]
fn test_no_candidates_select_virtual() {
    let strategy = choose_strategy(&[], 0.0, &AdaptiveThresholds::default());
    assert_eq!(strategy, GateStrategy::Virtual);
}

#[test]
fn test_single_location_venue_selects_virtual() {
    // Everything within the variance bound: one indoor location
    let candidates = vec![candidate(0.9, 47.370), candidate(0.85, 47.3701)];
    let strategy = choose_strategy(&candidates, 8.0, &AdaptiveThresholds::default());
    assert_eq!(strategy, GateStrategy::Virtual);
}

#[test]
fn test_low_confidence_selects_virtual() {
    let candidates = vec![candidate(0.5, 47.370), candidate(0.4, 47.372)];
    let strategy = choose_strategy(&candidates, 100.0, &AdaptiveThresholds::default());
    assert_eq!(strategy, GateStrategy::Virtual);
}

#[test]
fn test_confidence_threshold_is_respected() {
    let mut thresholds = AdaptiveThresholds::default();
    thresholds.confidence_threshold = 0.95;

    let candidates = vec![candidate(0.9, 47.370), candidate(0.85, 47.372)];
    assert_eq!(
        choose_strategy(&candidates, 100.0, &thresholds),
        GateStrategy::Virtual
    );

    thresholds.confidence_threshold = 0.75;
    assert_eq!(
        choose_strategy(&candidates, 100.0, &thresholds),
        GateStrategy::Physical
    );
}
