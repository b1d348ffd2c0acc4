//! # Gatefind
//!
//! Unsupervised gate discovery for geotagged event check-ins.
//!
//! This library provides:
//! - GPS quality filtering and statistical outlier rejection
//! - Adaptive-precision spatial clustering (density-connected, no fixed K)
//! - Multi-factor confidence scoring for candidate gates
//! - Physical-vs-virtual gate arbitration and idempotent materialization
//! - Orphan check-in assignment and duplicate-gate detection
//! - A milestone-driven recompute scheduler decoupled from ingestion
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel clustering with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use gatefind::{CheckinEvent, GateDiscoveryEngine, GpsSample};
//!
//! let mut engine = GateDiscoveryEngine::new();
//!
//! engine.record_checkin(CheckinEvent {
//!     id: "chk-1".to_string(),
//!     event_id: "festival".to_string(),
//!     attendee_id: "wb-001".to_string(),
//!     category: "general".to_string(),
//!     timestamp: 1_700_000_000,
//!     gps: Some(GpsSample::new(51.5074, -0.1278, 8.0)),
//!     gate_id: None,
//! })
//! .unwrap();
//!
//! let report = engine.quality_report("festival").unwrap();
//! println!("usable GPS: {:.0}%", report.gps_coverage * 100.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Unified error handling
pub mod error;
pub use error::{GateDiscoveryError, Result};

// Union-Find data structure for cluster components
pub mod union_find;
pub use union_find::UnionFind;

// Geographic utilities (distance, centroid, spread calculations)
pub mod geo_utils;

// GPS validity, accuracy bands, outlier rejection
pub mod quality;
pub use quality::{filter_quality, is_valid_gps, reject_outliers, AccuracyBand, QualitySample};

// Adaptive-epsilon density clustering
pub mod clustering;
pub use clustering::{cluster_samples, physical_candidates, SpatialCluster};

// Multi-factor confidence scoring
pub mod confidence;
pub use confidence::{score_cluster, score_virtual};

// Per-category virtual gate derivation
pub mod virtual_gates;
pub use virtual_gates::virtual_candidates;

// Physical-vs-virtual strategy arbitration
pub mod arbiter;
pub use arbiter::choose_strategy;

// Modular discovery engine with extracted components
pub mod engine;
pub use engine::{
    CheckinStore, DiscoveryPreview, GateDiscoveryEngine, GateStore, PassKind, RecomputeScheduler,
    SchedulerConfig,
};

// Synthetic check-in scenario generator for tests and benchmarks
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A plain latitude/longitude coordinate, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has in-range, finite coordinates.
    pub fn is_in_range(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A raw location claim attached to a check-in.
///
/// `accuracy` is the device-reported accuracy radius in meters; `None` when
/// the device did not report one (such samples are rejected by the quality
/// filter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl GpsSample {
    /// Create a sample with a reported accuracy radius.
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: Some(accuracy),
        }
    }

    /// Create a sample without a reported accuracy (always rejected).
    pub fn without_accuracy(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// An immutable attendance check-in fact.
///
/// Created by the ingestion path; the engine only ever sets `gate_id`
/// (assignment, or explicit re-assignment after a merge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinEvent {
    /// Unique identifier for this check-in
    pub id: String,
    /// Event this check-in belongs to
    pub event_id: String,
    /// Wristband/attendee identifier
    pub attendee_id: String,
    /// Attendee category label (e.g. "vip", "general", "staff")
    pub category: String,
    /// Unix timestamp (seconds since epoch)
    pub timestamp: i64,
    /// Optional location claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsSample>,
    /// Assigned gate, `None` until the orphan assigner attaches one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate_id: Option<String>,
}

/// Per-event operator configuration, read-only to the engine.
///
/// One record per event; passed explicitly into every pipeline call so that
/// passes for different events stay independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    /// Gates closer than this are flagged as merge candidates.
    /// Default: 10.0 meters
    pub duplicate_distance_meters: f64,

    /// Minimum member check-ins for a cluster to become a gate.
    /// Default: 3
    pub min_checkins_for_gate: usize,

    /// Minimum confidence for a gate to be considered enforceable.
    /// Default: 0.75
    pub confidence_threshold: f64,

    /// Maximum spatial spread (meters) for a "same place" decision; venues
    /// whose quality samples all fall within this spread are treated as a
    /// single indoor location and get virtual gates.
    /// Default: 15.0 meters
    pub max_location_variance_meters: f64,

    /// Member count at which the sample-size confidence factor saturates.
    /// Default: 50
    pub target_sample_size: usize,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            duplicate_distance_meters: 10.0,
            min_checkins_for_gate: 3,
            confidence_threshold: 0.75,
            max_location_variance_meters: 15.0,
            target_sample_size: 50,
        }
    }
}

/// Relative weights for the five confidence factors.
///
/// Weights are relative and need not sum to 1. Equal weighting is the
/// default; hosts may override individual factors. For virtual candidates the
/// spatial term is undefined and its weight is dropped, renormalizing the
/// remaining four.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub sample_size: f64,
    pub gps_accuracy: f64,
    pub category_purity: f64,
    pub spatial_consistency: f64,
    pub temporal_spread: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            sample_size: 1.0,
            gps_accuracy: 1.0,
            category_purity: 1.0,
            spatial_consistency: 1.0,
            temporal_spread: 1.0,
        }
    }
}

/// Engine-wide tuning, host-overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Clustering epsilon when the dominant accuracy band is High (<=15m).
    /// Default: 2.0 meters
    pub epsilon_high_meters: f64,

    /// Clustering epsilon when the dominant accuracy band is Good (<=30m).
    /// Default: 12.0 meters
    pub epsilon_good_meters: f64,

    /// Clustering epsilon when the dominant accuracy band is Fair (<=50m).
    /// Looser data needs a looser radius to avoid fragmenting one true
    /// location into many false clusters.
    /// Default: 120.0 meters
    pub epsilon_fair_meters: f64,

    /// Minimum wall-clock span for a cluster to be temporally consistent.
    /// Default: 1800 seconds (30 minutes)
    pub min_cluster_span_secs: i64,

    /// A cluster with at least this many members is accepted as consistent
    /// even when short-lived (a burst of near-simultaneous check-ins).
    /// Default: 10
    pub burst_member_count: usize,

    /// Below this many quality check-ins the event falls back to virtual
    /// gates regardless of spatial signal.
    /// Default: 100
    pub virtual_sample_threshold: usize,

    /// Activity span at which the temporal-spread factor saturates.
    /// Default: 3600 seconds
    pub target_duration_secs: i64,

    /// A physical candidate matches an existing gate when its centroid lies
    /// within this radius of the gate's centroid.
    /// Default: 25.0 meters
    pub stability_radius_meters: f64,

    /// Consecutive unsupported passes before a gate is archived.
    /// Default: 3
    pub archive_miss_limit: u32,

    /// Floor for the orphan-assignment search radius around a physical gate
    /// (the gate's own detection radius applies when larger).
    /// Default: 50.0 meters
    pub min_assignment_radius_meters: f64,

    /// Confidence factor weights.
    pub weights: ConfidenceWeights,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            epsilon_high_meters: 2.0,
            epsilon_good_meters: 12.0,
            epsilon_fair_meters: 120.0,
            min_cluster_span_secs: 1800,
            burst_member_count: 10,
            virtual_sample_threshold: 100,
            target_duration_secs: 3600,
            stability_radius_meters: 25.0,
            archive_miss_limit: 3,
            min_assignment_radius_meters: 50.0,
            weights: ConfidenceWeights::default(),
        }
    }
}

/// Gate kind: located by GPS centroid, or defined by attendee category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Physical,
    Virtual,
}

/// Gate lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Candidate,
    Probation,
    Confirmed,
    Archived,
}

/// Recommended enforcement strength, derived from the confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementStrength {
    Strict,
    Moderate,
    Relaxed,
    Probationary,
    NotRecommended,
}

impl EnforcementStrength {
    /// Map a confidence score to its enforcement band.
    ///
    /// >=0.95 strict; >=0.85 moderate; >=0.75 relaxed; >=0.65 probationary;
    /// below that enforcement is not recommended.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.95 {
            Self::Strict
        } else if confidence >= 0.85 {
            Self::Moderate
        } else if confidence >= 0.75 {
            Self::Relaxed
        } else if confidence >= 0.65 {
            Self::Probationary
        } else {
            Self::NotRecommended
        }
    }
}

/// The single active strategy for an event pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStrategy {
    Physical,
    Virtual,
}

/// An ephemeral candidate gate, produced fresh each pass.
///
/// Never persisted directly; consumed immediately by the arbiter and the
/// materializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCandidate {
    pub kind: GateKind,
    /// Cluster centroid; `None` for virtual candidates
    pub centroid: Option<GeoPoint>,
    /// Check-in ids belonging to this candidate
    pub member_ids: Vec<String>,
    pub member_count: usize,
    /// Category label -> member count
    pub categories: HashMap<String, usize>,
    /// Mean reported GPS accuracy of members (meters); `None` for virtual
    pub accuracy_mean: Option<f64>,
    /// Spread (std dev) of reported accuracy; `None` for virtual
    pub accuracy_spread: Option<f64>,
    /// Earliest member timestamp
    pub first_seen: i64,
    /// Latest member timestamp
    pub last_seen: i64,
    /// Computed confidence in [0,1]
    pub confidence: f64,
    /// How this candidate was derived ("spatial_cluster" or "category")
    pub method: String,
}

impl GateCandidate {
    /// Wall-clock span of member activity in seconds.
    pub fn span_secs(&self) -> i64 {
        self.last_seen - self.first_seen
    }

    /// The category with the most members, if any.
    ///
    /// Ties break lexicographically for determinism.
    pub fn dominant_category(&self) -> Option<&str> {
        self.categories
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(k, _)| k.as_str())
    }
}

/// A persisted gate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub id: String,
    pub event_id: String,
    pub kind: GateKind,
    pub name: String,
    /// Centroid of current member check-ins; `None` for virtual gates
    pub centroid: Option<GeoPoint>,
    /// Radius (meters) within which check-ins are considered at this gate
    pub detection_radius_meters: f64,
    pub dominant_category: Option<String>,
    pub confidence: f64,
    pub enforcement: EnforcementStrength,
    pub status: GateStatus,
    pub member_count: usize,
    /// Unix timestamp of creation
    pub created_at: i64,
    /// Unix timestamp of the last recompute pass that supported this gate
    pub last_recomputed_at: i64,
    /// Consecutive passes that produced no matching candidate
    pub misses: u32,
}

impl Gate {
    /// Whether the gate participates in assignment and duplicate detection.
    pub fn is_active(&self) -> bool {
        self.status != GateStatus::Archived
    }
}

/// A pairing of two gates whose centroids are suspiciously close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSuggestion {
    pub gate_id_a: String,
    pub gate_id_b: String,
    pub distance_meters: f64,
    /// Merge confidence from closeness and category overlap
    pub confidence: f64,
    pub status: MergeStatus,
}

/// Resolution state of a merge suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    Pending,
    Approved,
    Rejected,
}

/// Recommended strategy from a quality report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedStrategy {
    Physical,
    Virtual,
    /// Not enough data yet; keep collecting check-ins
    Wait,
}

/// Data-sufficiency summary for an event, regenerated each pass.
///
/// Cheap and side-effect free; safe to request repeatedly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub event_id: String,
    pub total_checkins: usize,
    /// Check-ins that passed the GPS quality filter
    pub usable_gps_count: usize,
    /// usable_gps_count / total_checkins (0.0 when empty)
    pub gps_coverage: f64,
    /// Mean reported accuracy over usable samples (meters)
    pub average_accuracy: Option<f64>,
    pub physical_candidates: usize,
    pub virtual_candidates: usize,
    pub recommended_strategy: RecommendedStrategy,
    /// Whether the best candidate clears the enforcement confidence bar
    pub enforceable: bool,
    /// Human-readable guidance for operators
    pub recommendations: Vec<String>,
}

/// Result summary of one full pipeline pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub event_id: String,
    pub strategy: GateStrategy,
    pub gates_created: usize,
    pub gates_updated: usize,
    pub gates_archived: usize,
    pub checkins_assigned: usize,
    /// Check-ins that still match no gate; reported, never dropped
    pub orphans_remaining: usize,
    pub merge_suggestions: usize,
}
