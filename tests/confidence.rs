//! Tests for the multi-factor confidence scorer

use gatefind::confidence::{category_purity, score_virtual};
use gatefind::clustering::SpatialCluster;
use gatefind::quality::{AccuracyBand, QualitySample};
use gatefind::{score_cluster, AdaptiveThresholds, ConfidenceWeights, DiscoveryConfig, GeoPoint};
use std::collections::HashMap;

fn tight_cluster(member_count: usize, span_secs: i64) -> SpatialCluster {
    let members: Vec<QualitySample> = (0..member_count)
        .map(|i| QualitySample {
            checkin_id: format!("chk-{i}"),
            category: "general".to_string(),
            timestamp: 1_700_000_000 + span_secs * i as i64 / member_count.max(1) as i64,
            point: GeoPoint::new(47.37, 8.55),
            accuracy: 10.0,
            band: AccuracyBand::High,
        })
        .collect();

    let mut categories = HashMap::new();
    categories.insert("general".to_string(), member_count);
    let first_seen = members.first().map(|m| m.timestamp).unwrap_or(0);
    let last_seen = members.last().map(|m| m.timestamp).unwrap_or(0);

    SpatialCluster {
        members,
        centroid: GeoPoint::new(47.37, 8.55),
        categories,
        accuracy_mean: 10.0,
        accuracy_spread: 0.0,
        first_seen,
        last_seen,
        epsilon_meters: 2.0,
        spread_meters: 0.0,
    }
}

#[test]
fn test_purity_single_category_is_one() {
    let mut categories = HashMap::new();
    categories.insert("vip".to_string(), 40);
    assert_eq!(category_purity(&categories), 1.0);
}

#[test]
fn test_purity_uniform_mix_is_zero() {
    let mut categories = HashMap::new();
    for name in ["a", "b", "c", "d"] {
        categories.insert(name.to_string(), 10);
    }
    assert!(category_purity(&categories) < 1e-9);
}

#[test]
fn test_purity_dominated_mix_is_high() {
    let mut categories = HashMap::new();
    categories.insert("general".to_string(), 95);
    categories.insert("staff".to_string(), 5);
    let purity = category_purity(&categories);
    assert!(purity > 0.7, "purity was {purity}");
}

#[test]
fn test_score_is_bounded() {
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();

    for count in [1, 5, 50, 500] {
        let score = score_cluster(&tight_cluster(count, 7200), &thresholds, &config);
        assert!((0.0..=1.0).contains(&score), "score {score} out of bounds");
    }
}

#[test]
fn test_strong_cluster_scores_high() {
    // Saturated sample size, tight spread, pure category, long span
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();
    let score = score_cluster(&tight_cluster(50, 7200), &thresholds, &config);
    assert!(score >= 0.9, "score was {score}");
}

#[test]
fn test_sample_size_factor_caps_at_target() {
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();
    let at_target = score_cluster(&tight_cluster(50, 7200), &thresholds, &config);
    let over_target = score_cluster(&tight_cluster(200, 7200), &thresholds, &config);
    assert_eq!(at_target, over_target);
}

#[test]
fn test_loose_spread_lowers_score() {
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();

    let tight = tight_cluster(50, 7200);
    let mut loose = tight_cluster(50, 7200);
    loose.spread_meters = loose.epsilon_meters; // spread fills the radius

    let tight_score = score_cluster(&tight, &thresholds, &config);
    let loose_score = score_cluster(&loose, &thresholds, &config);
    assert!(loose_score < tight_score);
}

#[test]
fn test_weight_override_changes_emphasis() {
    let thresholds = AdaptiveThresholds::default();
    let mut config = DiscoveryConfig::default();

    // Short span hurts the default score
    let short_lived = tight_cluster(50, 60);
    let default_score = score_cluster(&short_lived, &thresholds, &config);

    // Ignoring the temporal factor should raise it
    config.weights = ConfidenceWeights {
        temporal_spread: 0.0,
        ..ConfidenceWeights::default()
    };
    let weighted_score = score_cluster(&short_lived, &thresholds, &config);
    assert!(weighted_score > default_score);
}

#[test]
fn test_virtual_score_without_gps() {
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();

    let score = score_virtual(50, None, 7200, &thresholds, &config);
    assert!((0.0..=1.0).contains(&score));
    // Saturated sample, pure category, saturated temporal terms
    assert!(score >= 0.9, "score was {score}");
}

#[test]
fn test_virtual_score_grows_with_members() {
    let thresholds = AdaptiveThresholds::default();
    let config = DiscoveryConfig::default();

    let few = score_virtual(5, None, 7200, &thresholds, &config);
    let many = score_virtual(50, None, 7200, &thresholds, &config);
    assert!(many > few);
}
