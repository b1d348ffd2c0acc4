//! Multi-factor confidence scoring for gate candidates.
//!
//! Five normalized sub-scores — sample-size adequacy, GPS accuracy, category
//! purity, spatial consistency, temporal spread — combine by weighted average
//! into one [0,1] confidence per candidate. Weights come from
//! [`ConfidenceWeights`](crate::ConfidenceWeights); factors that are
//! undefined for a candidate (no location, no reported accuracy) drop out and
//! the remaining weights renormalize.

use crate::clustering::SpatialCluster;
use crate::{AdaptiveThresholds, DiscoveryConfig};
use std::collections::HashMap;

/// Reported accuracy at or below this scores a full 1.0.
const ACCURACY_PERFECT_METERS: f64 = 5.0;
/// Reported accuracy at or above this scores 0.0.
const ACCURACY_ZERO_METERS: f64 = 100.0;

/// Linear interpolation of a "smaller is better" value between a perfect and
/// a zero threshold.
fn score_between(value: f64, perfect: f64, zero: f64) -> f64 {
    if value <= perfect {
        return 1.0;
    }
    if value >= zero {
        return 0.0;
    }
    1.0 - (value - perfect) / (zero - perfect)
}

/// Sample-size adequacy: count relative to the target sample size, capped.
fn sample_size_score(count: usize, target: usize) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (count as f64 / target as f64).min(1.0)
}

/// Category purity: one minus the normalized entropy of the category
/// distribution. A single-category candidate scores 1; a uniform mix across
/// many categories scores near 0.
pub fn category_purity(categories: &HashMap<String, usize>) -> f64 {
    let total: usize = categories.values().sum();
    let distinct = categories.len();
    if total == 0 || distinct <= 1 {
        return 1.0;
    }

    let entropy: f64 = categories
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.ln()
        })
        .sum();

    let max_entropy = (distinct as f64).ln();
    (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
}

/// Temporal spread: span of activity relative to the target duration, capped.
fn temporal_score(span_secs: i64, target_secs: i64) -> f64 {
    if target_secs <= 0 {
        return 1.0;
    }
    (span_secs.max(0) as f64 / target_secs as f64).min(1.0)
}

/// Weighted average over the defined factors; `None` scores drop their
/// weight. Returns 0 when every factor is undefined.
fn weighted_average(parts: &[(f64, Option<f64>)]) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for (weight, score) in parts {
        if let Some(score) = score {
            total += weight * score;
            weight_sum += weight;
        }
    }
    if weight_sum == 0.0 {
        return 0.0;
    }
    (total / weight_sum).clamp(0.0, 1.0)
}

/// Confidence for a physical cluster candidate.
pub fn score_cluster(
    cluster: &SpatialCluster,
    thresholds: &AdaptiveThresholds,
    config: &DiscoveryConfig,
) -> f64 {
    let w = &config.weights;

    let sample = sample_size_score(cluster.members.len(), thresholds.target_sample_size);
    let accuracy = score_between(
        cluster.accuracy_mean,
        ACCURACY_PERFECT_METERS,
        ACCURACY_ZERO_METERS,
    );
    let purity = category_purity(&cluster.categories);
    // Tightness of members around the centroid relative to the epsilon used.
    let spatial = if cluster.epsilon_meters > 0.0 {
        1.0 - (cluster.spread_meters / cluster.epsilon_meters).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let temporal = temporal_score(cluster.span_secs(), config.target_duration_secs);

    weighted_average(&[
        (w.sample_size, Some(sample)),
        (w.gps_accuracy, Some(accuracy)),
        (w.category_purity, Some(purity)),
        (w.spatial_consistency, Some(spatial)),
        (w.temporal_spread, Some(temporal)),
    ])
}

/// Confidence for a virtual (per-category) candidate.
///
/// The spatial term is undefined without a location; the temporal spread of
/// the category's activity substitutes for it. Accuracy participates only
/// when some members carried usable GPS.
pub fn score_virtual(
    member_count: usize,
    accuracy_mean: Option<f64>,
    span_secs: i64,
    thresholds: &AdaptiveThresholds,
    config: &DiscoveryConfig,
) -> f64 {
    let w = &config.weights;

    let sample = sample_size_score(member_count, thresholds.target_sample_size);
    let accuracy =
        accuracy_mean.map(|mean| score_between(mean, ACCURACY_PERFECT_METERS, ACCURACY_ZERO_METERS));
    // One candidate per category: the distribution is pure by construction.
    let purity = 1.0;
    let temporal = temporal_score(span_secs, config.target_duration_secs);

    weighted_average(&[
        (w.sample_size, Some(sample)),
        (w.gps_accuracy, accuracy),
        (w.category_purity, Some(purity)),
        (w.spatial_consistency, Some(temporal)),
        (w.temporal_spread, Some(temporal)),
    ])
}
