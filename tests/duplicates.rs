//! Tests for duplicate-gate detection and merge resolution

use gatefind::engine::GateStore;
use gatefind::{
    AdaptiveThresholds, GateCandidate, GateDiscoveryEngine, GateKind, GateStatus, GateStrategy,
    GeoPoint, GpsSample, MergeStatus,
};
use std::collections::HashMap;

// ~8m of latitude
const LAT_8M: f64 = 0.000072;

fn physical_candidate(lat: f64, members: usize) -> GateCandidate {
    let mut categories = HashMap::new();
    categories.insert("general".to_string(), members);
    GateCandidate {
        kind: GateKind::Physical,
        centroid: Some(GeoPoint::new(lat, 8.55)),
        member_ids: (0..members).map(|i| format!("chk-{lat}-{i}")).collect(),
        member_count: members,
        categories,
        accuracy_mean: Some(10.0),
        accuracy_spread: Some(0.0),
        first_seen: 1_700_000_000,
        last_seen: 1_700_007_200,
        confidence: 0.9,
        method: "spatial_cluster".to_string(),
    }
}

fn store_with_close_gates() -> (GateStore, String, String) {
    let mut store = GateStore::new();
    let candidates = vec![
        physical_candidate(47.370, 20),
        physical_candidate(47.370 + LAT_8M, 20),
    ];
    store.materialize(
        "ev-1",
        GateStrategy::Physical,
        &candidates,
        1_700_010_000,
        &gatefind::DiscoveryConfig::default(),
    );
    let gates = store.gates_for_event("ev-1");
    assert_eq!(gates.len(), 2);
    let (a, b) = (gates[0].id.clone(), gates[1].id.clone());
    (store, a, b)
}

#[test]
fn test_gates_within_duplicate_distance_are_flagged() {
    let (mut store, a, b) = store_with_close_gates();

    let pending = store.detect_duplicates("ev-1", &AdaptiveThresholds::default());
    assert_eq!(pending, 1);

    let suggestions = store.suggestions_for("ev-1");
    assert_eq!(suggestions.len(), 1);
    let suggestion = &suggestions[0];
    assert_eq!(suggestion.gate_id_a, a);
    assert_eq!(suggestion.gate_id_b, b);
    assert_eq!(suggestion.status, MergeStatus::Pending);
    assert!((suggestion.distance_meters - 8.0).abs() < 0.1);

    // 0.7 * closeness + 0.3 * same-category overlap
    let closeness = 1.0 - suggestion.distance_meters / 10.0;
    let expected = 0.7 * closeness + 0.3;
    assert!((suggestion.confidence - expected).abs() < 1e-9);
}

#[test]
fn test_distant_gates_are_not_flagged() {
    let mut store = GateStore::new();
    let candidates = vec![
        physical_candidate(47.370, 20),
        physical_candidate(47.3718, 20), // ~200m north
    ];
    store.materialize(
        "ev-1",
        GateStrategy::Physical,
        &candidates,
        1_700_010_000,
        &gatefind::DiscoveryConfig::default(),
    );

    let pending = store.detect_duplicates("ev-1", &AdaptiveThresholds::default());
    assert_eq!(pending, 0);
    assert!(store.suggestions_for("ev-1").is_empty());
}

#[test]
fn test_approving_a_merge_archives_the_second_gate() {
    let (mut store, a, b) = store_with_close_gates();
    store.detect_duplicates("ev-1", &AdaptiveThresholds::default());

    let merged = store.resolve_suggestion("ev-1", &a, &b, true);
    assert_eq!(merged.as_deref(), Some(b.as_str()));
    assert_eq!(store.get(&b).map(|g| g.status), Some(GateStatus::Archived));
    assert!(store.get(&a).map(|g| g.is_active()).unwrap_or(false));

    // With one party archived the pair is no longer reported
    let pending = store.detect_duplicates("ev-1", &AdaptiveThresholds::default());
    assert_eq!(pending, 0);
}

#[test]
fn test_rejected_suggestion_stays_resolved_across_passes() {
    let (mut store, a, b) = store_with_close_gates();
    store.detect_duplicates("ev-1", &AdaptiveThresholds::default());

    let merged = store.resolve_suggestion("ev-1", &a, &b, false);
    assert!(merged.is_none());
    assert!(store.get(&b).map(|g| g.is_active()).unwrap_or(false));

    // Both gates are still active so the pair reappears, but the operator's
    // rejection carries over instead of resetting to pending.
    let pending = store.detect_duplicates("ev-1", &AdaptiveThresholds::default());
    assert_eq!(pending, 0);
    let suggestions = store.suggestions_for("ev-1");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].status, MergeStatus::Rejected);
}

#[test]
fn test_resolving_unknown_pair_is_a_noop() {
    let (mut store, a, _) = store_with_close_gates();
    store.detect_duplicates("ev-1", &AdaptiveThresholds::default());
    assert!(store.resolve_suggestion("ev-1", &a, "gate-ev-1-99", true).is_none());
    assert!(store.resolve_suggestion("ev-2", &a, &a, true).is_none());
}

#[test]
fn test_engine_merge_reassigns_checkins() {
    // Two tight groups 8m apart; with the variance bound lowered the arbiter
    // keeps them physical, producing two gates close enough to flag.
    let mut engine = GateDiscoveryEngine::new();
    for i in 0..30 {
        let lat = if i % 2 == 0 { 47.370 } else { 47.370 + LAT_8M };
        engine
            .record_checkin(gatefind::CheckinEvent {
                id: format!("chk-{i}"),
                event_id: "expo".to_string(),
                attendee_id: format!("wb-{i}"),
                category: "general".to_string(),
                timestamp: 1_700_000_000 + i as i64 * 300,
                gps: Some(GpsSample::new(lat, 8.55, 10.0)),
                gate_id: None,
            })
            .unwrap();
    }
    engine.set_thresholds(
        "expo",
        AdaptiveThresholds {
            max_location_variance_meters: 2.0,
            ..AdaptiveThresholds::default()
        },
    );

    let summary = engine.run_pipeline("expo").unwrap();
    assert_eq!(summary.strategy, GateStrategy::Physical);
    assert_eq!(summary.gates_created, 2);
    assert_eq!(summary.merge_suggestions, 1);

    let suggestion = engine.merge_suggestions("expo")[0].clone();
    let reassigned = engine
        .resolve_merge("expo", &suggestion.gate_id_a, &suggestion.gate_id_b, true)
        .unwrap();
    assert_eq!(reassigned, 15);

    let surviving = &suggestion.gate_id_a;
    let checkins = engine.checkins("expo");
    assert!(checkins
        .iter()
        .all(|c| c.gate_id.as_deref() == Some(surviving.as_str())));
}
