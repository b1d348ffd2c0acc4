//! Adaptive-precision spatial clustering.
//!
//! Groups quality-filtered samples into density-connected regions: every pair
//! of samples within the adjacency radius (epsilon) is connected, and
//! connected components become candidate clusters. There is no fixed cluster
//! count.
//!
//! Epsilon is chosen from the dominant accuracy band of the samples under
//! consideration — looser data gets a looser radius, so one true location is
//! not fragmented into many false clusters by GPS noise.
//!
//! An R-tree over the sample positions provides a coarse degree-space
//! pre-filter for neighbor candidates; cluster membership is always decided
//! by the exact Haversine test.

use crate::confidence::score_cluster;
use crate::error::{OptionExt, Result};
use crate::geo_utils::{compute_centroid, degree_padding, distance_stats, haversine_distance,
    mean_and_std_dev};
use crate::quality::{reject_outliers, AccuracyBand, QualitySample};
use crate::union_find::UnionFind;
use crate::{AdaptiveThresholds, DiscoveryConfig, GateCandidate, GateKind, GeoPoint};
use log::{debug, warn};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A density-connected region of quality samples with its statistics.
#[derive(Debug, Clone)]
pub struct SpatialCluster {
    pub members: Vec<QualitySample>,
    pub centroid: GeoPoint,
    /// Category label -> member count
    pub categories: HashMap<String, usize>,
    /// Mean reported accuracy of members (meters)
    pub accuracy_mean: f64,
    /// Std dev of reported accuracy
    pub accuracy_spread: f64,
    pub first_seen: i64,
    pub last_seen: i64,
    /// Epsilon used to grow this cluster
    pub epsilon_meters: f64,
    /// Mean member distance from the centroid
    pub spread_meters: f64,
}

impl SpatialCluster {
    pub fn span_secs(&self) -> i64 {
        self.last_seen - self.first_seen
    }
}

/// Sample position wrapper for R-tree pre-filtering. Position is [lng, lat]
/// to match the x/y envelope convention.
struct SamplePosition {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for SamplePosition {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

/// The most common accuracy band among the samples.
///
/// Ties break towards the tighter band, keeping epsilon conservative.
pub fn dominant_band(samples: &[QualitySample]) -> AccuracyBand {
    let mut counts: HashMap<AccuracyBand, usize> = HashMap::new();
    for sample in samples {
        *counts.entry(sample.band).or_insert(0) += 1;
    }

    // Loosest first: max_by_key keeps the last of equal maxima, so a tied
    // count resolves to the tighter band.
    [AccuracyBand::Fair, AccuracyBand::Good, AccuracyBand::High]
        .into_iter()
        .max_by_key(|band| counts.get(band).copied().unwrap_or(0))
        .unwrap_or(AccuracyBand::Fair)
}

/// Adjacency radius for a dominant accuracy band.
pub fn epsilon_for_band(band: AccuracyBand, config: &DiscoveryConfig) -> f64 {
    match band {
        AccuracyBand::High => config.epsilon_high_meters,
        AccuracyBand::Good => config.epsilon_good_meters,
        AccuracyBand::Fair | AccuracyBand::Rejected => config.epsilon_fair_meters,
    }
}

/// Neighbor pairs within `epsilon` meters, via coarse R-tree query then exact
/// Haversine test.
fn adjacent_pairs(samples: &[QualitySample], epsilon: f64) -> Vec<(usize, usize)> {
    let tree = RTree::bulk_load(
        samples
            .iter()
            .enumerate()
            .map(|(index, s)| SamplePosition {
                index,
                position: [s.point.longitude, s.point.latitude],
            })
            .collect(),
    );

    let pairs_for = |(i, sample): (usize, &QualitySample)| -> Vec<(usize, usize)> {
        let (lat_pad, lng_pad) = degree_padding(sample.point.latitude, epsilon);
        let envelope = AABB::from_corners(
            [sample.point.longitude - lng_pad, sample.point.latitude - lat_pad],
            [sample.point.longitude + lng_pad, sample.point.latitude + lat_pad],
        );

        tree.locate_in_envelope_intersecting(&envelope)
            .filter(|candidate| candidate.index > i)
            .filter(|candidate| {
                haversine_distance(&sample.point, &samples[candidate.index].point) <= epsilon
            })
            .map(|candidate| (i, candidate.index))
            .collect()
    };

    #[cfg(feature = "parallel")]
    {
        samples.par_iter().enumerate().flat_map_iter(pairs_for).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        samples.iter().enumerate().flat_map(pairs_for).collect()
    }
}

/// Compute final statistics for a cluster's members.
///
/// A degenerate (empty) member set is a per-candidate `Computation` error;
/// the caller drops that candidate rather than aborting the pass.
fn cluster_stats(members: Vec<QualitySample>, epsilon: f64) -> Result<SpatialCluster> {
    let first_seen = members
        .iter()
        .map(|s| s.timestamp)
        .min()
        .ok_or_computation("cluster has no members after outlier rejection")?;
    let last_seen = members
        .iter()
        .map(|s| s.timestamp)
        .max()
        .ok_or_computation("cluster has no members after outlier rejection")?;

    let points: Vec<GeoPoint> = members.iter().map(|s| s.point).collect();
    let centroid = compute_centroid(&points);
    let spread = distance_stats(&points, &centroid);

    let accuracies: Vec<f64> = members.iter().map(|s| s.accuracy).collect();
    let (accuracy_mean, accuracy_spread) = mean_and_std_dev(&accuracies);

    let mut categories: HashMap<String, usize> = HashMap::new();
    for member in &members {
        *categories.entry(member.category.clone()).or_insert(0) += 1;
    }

    Ok(SpatialCluster {
        members,
        centroid,
        categories,
        accuracy_mean,
        accuracy_spread,
        first_seen,
        last_seen,
        epsilon_meters: epsilon,
        spread_meters: spread.mean,
    })
}

/// Whether a region's members are temporally consistent: span at least the
/// configured minimum, or a burst of at least `burst_member_count` members.
fn is_temporally_consistent(members: &[QualitySample], config: &DiscoveryConfig) -> bool {
    if members.len() >= config.burst_member_count {
        return true;
    }
    let first = members.iter().map(|s| s.timestamp).min().unwrap_or(0);
    let last = members.iter().map(|s| s.timestamp).max().unwrap_or(0);
    last - first >= config.min_cluster_span_secs
}

/// Group quality samples into candidate clusters.
///
/// Pipeline per region: coarse connected components at the band-adaptive
/// epsilon, per-region outlier rejection, then the survival checks
/// (`min_checkins_for_gate`, temporal consistency) and final statistics.
///
/// Output is deterministic: clusters ordered by first member appearance,
/// members in input order.
pub fn cluster_samples(
    samples: &[QualitySample],
    thresholds: &AdaptiveThresholds,
    config: &DiscoveryConfig,
) -> Vec<SpatialCluster> {
    if samples.is_empty() {
        return Vec::new();
    }

    let band = dominant_band(samples);
    let epsilon = epsilon_for_band(band, config);
    debug!(
        "clustering {} samples, dominant band {:?}, epsilon {:.1}m",
        samples.len(),
        band,
        epsilon
    );

    let mut uf: UnionFind<usize> = UnionFind::new();
    for i in 0..samples.len() {
        uf.make_set(i);
    }
    for (i, j) in adjacent_pairs(samples, epsilon) {
        uf.union(&i, &j);
    }

    // Deterministic component ordering: key each component by its smallest
    // member index.
    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..samples.len() {
        let root = uf.find(&i);
        components.entry(root).or_default().push(i);
    }
    let mut ordered: Vec<Vec<usize>> = components.into_values().collect();
    for component in &mut ordered {
        component.sort_unstable();
    }
    ordered.sort_by_key(|component| component[0]);

    let mut clusters = Vec::new();
    for component in ordered {
        let members: Vec<QualitySample> =
            component.iter().map(|&i| samples[i].clone()).collect();

        let members = reject_outliers(members);

        if members.len() < thresholds.min_checkins_for_gate {
            continue;
        }
        if !is_temporally_consistent(&members, config) {
            continue;
        }

        match cluster_stats(members, epsilon) {
            Ok(cluster) => clusters.push(cluster),
            Err(e) => warn!("dropping candidate cluster: {}", e),
        }
    }

    debug!("formed {} candidate clusters", clusters.len());
    clusters
}

/// Build scored physical gate candidates from quality samples.
pub fn physical_candidates(
    samples: &[QualitySample],
    thresholds: &AdaptiveThresholds,
    config: &DiscoveryConfig,
) -> Vec<GateCandidate> {
    let clusters = cluster_samples(samples, thresholds, config);

    let mut candidates: Vec<GateCandidate> = clusters
        .into_iter()
        .map(|cluster| {
            let confidence = score_cluster(&cluster, thresholds, config);
            GateCandidate {
                kind: GateKind::Physical,
                centroid: Some(cluster.centroid),
                member_ids: cluster.members.iter().map(|m| m.checkin_id.clone()).collect(),
                member_count: cluster.members.len(),
                categories: cluster.categories,
                accuracy_mean: Some(cluster.accuracy_mean),
                accuracy_spread: Some(cluster.accuracy_spread),
                first_seen: cluster.first_seen,
                last_seen: cluster.last_seen,
                confidence,
                method: "spatial_cluster".to_string(),
            }
        })
        .collect();

    // Strongest candidates first; stable tie-break on member count.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.member_count.cmp(&a.member_count))
    });

    candidates
}
