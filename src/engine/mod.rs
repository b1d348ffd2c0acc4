//! # Gate Discovery Engine
//!
//! Orchestration of the full discovery pipeline with focused subcomponents:
//!
//! - `CheckinStore` - check-in ingestion, counters, snapshots
//! - `GateStore` - materialized gates, duplicate detection, assignment lookups
//! - `RecomputeScheduler` - milestone triggers and per-event execution locks
//!
//! One pass flows one way: snapshot -> quality filter -> candidate clusters
//! and/or category groups -> scored candidates -> arbitrated winner set ->
//! materialized gates -> orphan assignment -> duplicate detection -> summary.
//!
//! The three operational entry points (`quality_report`, `preview_discovery`,
//! `run_pipeline`) are read-only or idempotent and safe to call repeatedly.

pub mod checkin_store;
pub mod gate_store;
pub mod scheduler;

pub use checkin_store::CheckinStore;
pub use gate_store::{GateStore, MaterializeOutcome};
pub use scheduler::{PassKind, RecomputeScheduler, SchedulerConfig};

use crate::arbiter::choose_strategy;
use crate::clustering::physical_candidates;
use crate::error::{GateDiscoveryError, Result};
use crate::geo_utils::spatial_extent;
use crate::quality::filter_quality;
use crate::virtual_gates::virtual_candidates;
use crate::{
    AdaptiveThresholds, CheckinEvent, DiscoveryConfig, Gate, GateCandidate, GateStrategy,
    GeoPoint, MergeSuggestion, PipelineSummary, QualityReport, RecommendedStrategy,
};
use log::{info, warn};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Candidate sets computed without persisting anything.
#[derive(Debug, Clone)]
pub struct DiscoveryPreview {
    pub event_id: String,
    pub physical: Vec<GateCandidate>,
    pub virtual_candidates: Vec<GateCandidate>,
    /// Spatial extent (max pairwise distance) of the quality samples, meters
    pub sample_extent_meters: f64,
    /// The strategy the arbiter would pick
    pub strategy: GateStrategy,
}

/// The gate discovery engine.
///
/// Ingestion (`record_checkin`) is a high-frequency, low-latency write path:
/// an O(1) append plus a counter bump that never blocks on clustering. The
/// scheduler tells the caller when a background pass is due; running it is
/// the caller's (background) job.
pub struct GateDiscoveryEngine {
    checkins: CheckinStore,
    gates: GateStore,
    scheduler: RecomputeScheduler,
    thresholds: HashMap<String, AdaptiveThresholds>,
    config: DiscoveryConfig,
}

impl Default for GateDiscoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GateDiscoveryEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(DiscoveryConfig::default(), SchedulerConfig::default())
    }

    /// Create an engine with custom tuning and milestone policy.
    pub fn with_config(config: DiscoveryConfig, scheduler: SchedulerConfig) -> Self {
        Self {
            checkins: CheckinStore::new(),
            gates: GateStore::new(),
            scheduler: RecomputeScheduler::with_config(scheduler),
            thresholds: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Override the per-event operator thresholds.
    pub fn set_thresholds(&mut self, event_id: &str, thresholds: AdaptiveThresholds) {
        self.thresholds.insert(event_id.to_string(), thresholds);
    }

    /// Per-event thresholds, falling back to defaults when unset.
    pub fn thresholds_for(&self, event_id: &str) -> AdaptiveThresholds {
        self.thresholds.get(event_id).cloned().unwrap_or_default()
    }

    // ========================================================================
    // Ingestion (write path)
    // ========================================================================

    /// Record a check-in and report what background pass, if any, its volume
    /// milestone makes due. Never runs the pipeline inline.
    pub fn record_checkin(&mut self, checkin: CheckinEvent) -> Result<Option<PassKind>> {
        if checkin.event_id.trim().is_empty() {
            return Err(GateDiscoveryError::MissingEvent {
                event_id: checkin.event_id,
            });
        }
        let event_id = checkin.event_id.clone();
        let total = self.checkins.add(checkin);
        Ok(self.scheduler.due(&event_id, total))
    }

    /// Events whose recompute triggers were deferred behind a running pass.
    pub fn take_deferred(&mut self) -> Vec<String> {
        self.scheduler.take_deferred()
    }

    // ========================================================================
    // Read-only operational surface
    // ========================================================================

    /// Summarize data sufficiency and recommend a strategy.
    ///
    /// Read-only and cheap; safe to call anytime, repeatedly.
    pub fn quality_report(&self, event_id: &str) -> Result<QualityReport> {
        self.require_event(event_id)?;
        let thresholds = self.thresholds_for(event_id);
        let snapshot = self.checkins.snapshot(event_id);

        let samples = filter_quality(&snapshot);
        let total = snapshot.len();
        let usable = samples.len();
        let coverage = if total == 0 {
            0.0
        } else {
            usable as f64 / total as f64
        };
        let average_accuracy = if samples.is_empty() {
            None
        } else {
            Some(samples.iter().map(|s| s.accuracy).sum::<f64>() / samples.len() as f64)
        };

        let physical = physical_candidates(&samples, &thresholds, &self.config);
        let virtuals = virtual_candidates(&snapshot, &thresholds, &self.config);
        let points: Vec<GeoPoint> = samples.iter().map(|s| s.point).collect();
        let extent = spatial_extent(&points);
        let strategy = choose_strategy(&physical, extent, &thresholds);

        let enough_data = total as u64 >= self.scheduler.config().initial_pass_at;
        let recommended = if !enough_data {
            RecommendedStrategy::Wait
        } else {
            match strategy {
                GateStrategy::Physical => RecommendedStrategy::Physical,
                GateStrategy::Virtual => RecommendedStrategy::Virtual,
            }
        };

        let best_confidence = match strategy {
            GateStrategy::Physical => &physical,
            GateStrategy::Virtual => &virtuals,
        }
        .iter()
        .map(|c| c.confidence)
        .fold(0.0_f64, f64::max);
        let enforceable = enough_data && best_confidence >= thresholds.confidence_threshold;

        let mut recommendations = Vec::new();
        if !enough_data {
            recommendations.push(format!(
                "Only {} check-in(s) recorded; wait for more before creating gates",
                total
            ));
        } else {
            match recommended {
                RecommendedStrategy::Physical => recommendations.push(format!(
                    "{} physical gate candidate(s) found; best confidence {:.2}",
                    physical.len(),
                    best_confidence
                )),
                RecommendedStrategy::Virtual => recommendations.push(format!(
                    "Virtual gates by category recommended ({} categories)",
                    virtuals.len()
                )),
                RecommendedStrategy::Wait => {}
            }
            if total > 0 && coverage < 0.5 {
                recommendations.push(format!(
                    "GPS coverage is low ({:.0}%); spatial clustering is unreliable",
                    coverage * 100.0
                ));
            }
            if !enforceable {
                recommendations.push(
                    "Confidence below the enforcement threshold; keep gates advisory".to_string(),
                );
            }
        }

        Ok(QualityReport {
            event_id: event_id.to_string(),
            total_checkins: total,
            usable_gps_count: usable,
            gps_coverage: coverage,
            average_accuracy,
            physical_candidates: physical.len(),
            virtual_candidates: virtuals.len(),
            recommended_strategy: recommended,
            enforceable,
            recommendations,
        })
    }

    /// Compute the candidate sets and the arbiter's decision without
    /// persisting anything.
    pub fn preview_discovery(&self, event_id: &str) -> Result<DiscoveryPreview> {
        self.require_event(event_id)?;
        let thresholds = self.thresholds_for(event_id);
        let snapshot = self.checkins.snapshot(event_id);

        let samples = filter_quality(&snapshot);
        let physical = physical_candidates(&samples, &thresholds, &self.config);
        let virtuals = virtual_candidates(&snapshot, &thresholds, &self.config);
        let points: Vec<GeoPoint> = samples.iter().map(|s| s.point).collect();
        let extent = spatial_extent(&points);
        let strategy = choose_strategy(&physical, extent, &thresholds);

        Ok(DiscoveryPreview {
            event_id: event_id.to_string(),
            physical,
            virtual_candidates: virtuals,
            sample_extent_meters: extent,
            strategy,
        })
    }

    // ========================================================================
    // Pipeline (background passes)
    // ========================================================================

    /// Run the full materialize/assign/detect sequence for an event.
    ///
    /// Takes the per-event execution lock; a concurrent trigger gets
    /// `PassInProgress` (a deferral). Stages are sequential, each completing
    /// fully before the next; a later stage failing never rolls back an
    /// earlier one — every stage is independently idempotent and retryable.
    pub fn run_pipeline(&mut self, event_id: &str) -> Result<PipelineSummary> {
        self.require_event(event_id)?;
        self.scheduler.begin(event_id)?;
        let ingested = self.checkins.ingested_count(event_id);

        let result = self.execute_full_pass(event_id);
        match &result {
            Ok(_) => self.scheduler.finish(event_id, PassKind::Full, ingested),
            Err(e) => {
                warn!("pipeline pass for '{}' failed: {}", event_id, e);
                self.scheduler.abandon(event_id);
            }
        }
        result
    }

    /// Assign orphans against the existing gates without re-clustering.
    ///
    /// Returns the number of check-ins assigned. A no-op (0) when no pass
    /// has materialized gates yet.
    pub fn run_orphan_sweep(&mut self, event_id: &str) -> Result<usize> {
        self.require_event(event_id)?;
        self.scheduler.begin(event_id)?;
        let ingested = self.checkins.ingested_count(event_id);

        let assigned = match self.gates.strategy_for(event_id) {
            Some(strategy) => self.assign_orphans(event_id, strategy),
            None => 0,
        };
        self.scheduler
            .finish(event_id, PassKind::OrphanSweep, ingested);
        Ok(assigned)
    }

    fn execute_full_pass(&mut self, event_id: &str) -> Result<PipelineSummary> {
        let thresholds = self.thresholds_for(event_id);
        let snapshot = self.checkins.snapshot(event_id);

        // Stage 0: candidates and arbitration on the snapshot.
        let samples = filter_quality(&snapshot);
        let physical = physical_candidates(&samples, &thresholds, &self.config);
        let virtuals = virtual_candidates(&snapshot, &thresholds, &self.config);
        let points: Vec<GeoPoint> = samples.iter().map(|s| s.point).collect();
        let extent = spatial_extent(&points);
        let strategy = choose_strategy(&physical, extent, &thresholds);
        let winners = match strategy {
            GateStrategy::Physical => &physical,
            GateStrategy::Virtual => &virtuals,
        };

        // Stage 1: materialize the winning candidate set.
        let now = unix_now();
        let outcome = self
            .gates
            .materialize(event_id, strategy, winners, now, &self.config);

        // Stage 2: orphan assignment against the materialized gates.
        let assigned = self.assign_orphans(event_id, strategy);
        let orphans = self.checkins.unassigned_count(event_id);

        // Stage 3: duplicate detection (physical gates only).
        let suggestions = self.gates.detect_duplicates(event_id, &thresholds);

        info!(
            "pass for '{}': {:?} strategy, {} created, {} updated, {} archived, {} assigned, {} orphaned, {} merge suggestion(s)",
            event_id,
            strategy,
            outcome.created,
            outcome.updated,
            outcome.archived,
            assigned,
            orphans,
            suggestions
        );

        Ok(PipelineSummary {
            event_id: event_id.to_string(),
            strategy,
            gates_created: outcome.created,
            gates_updated: outcome.updated,
            gates_archived: outcome.archived,
            checkins_assigned: assigned,
            orphans_remaining: orphans,
            merge_suggestions: suggestions,
        })
    }

    fn assign_orphans(&mut self, event_id: &str, strategy: GateStrategy) -> usize {
        let orphans = self.checkins.unassigned(event_id);
        let mut assigned = 0;
        for checkin in orphans {
            let gate_id = self
                .gates
                .find_assignment(event_id, &checkin, strategy, &self.config)
                .map(|g| g.id.clone());
            if let Some(gate_id) = gate_id {
                if self.checkins.assign_gate(event_id, &checkin.id, &gate_id) {
                    assigned += 1;
                }
            }
        }
        assigned
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Current gate records for an event (including archived).
    pub fn gates(&self, event_id: &str) -> Vec<Gate> {
        self.gates
            .gates_for_event(event_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Current merge suggestions for an event.
    pub fn merge_suggestions(&self, event_id: &str) -> Vec<MergeSuggestion> {
        self.gates.suggestions_for(event_id).to_vec()
    }

    /// The event's check-ins with their current gate references.
    pub fn checkins(&self, event_id: &str) -> Vec<CheckinEvent> {
        self.checkins.snapshot(event_id)
    }

    /// Resolve a merge suggestion. On approval the merged gate is archived
    /// and its check-ins explicitly re-assigned to the surviving gate;
    /// returns the number re-assigned.
    pub fn resolve_merge(
        &mut self,
        event_id: &str,
        keep_gate_id: &str,
        merge_gate_id: &str,
        approve: bool,
    ) -> Result<usize> {
        self.require_event(event_id)?;
        match self
            .gates
            .resolve_suggestion(event_id, keep_gate_id, merge_gate_id, approve)
        {
            Some(merged) => Ok(self.checkins.reassign_gate(event_id, &merged, keep_gate_id)),
            None => Ok(0),
        }
    }

    /// Gate records as JSON (for host display layers).
    pub fn gates_json(&self, event_id: &str) -> String {
        serde_json::to_string(&self.gates(event_id)).unwrap_or_else(|e| {
            warn!("failed to serialize gates for event '{}': {}", event_id, e);
            "[]".to_string()
        })
    }

    fn require_event(&self, event_id: &str) -> Result<()> {
        if event_id.trim().is_empty() || !self.checkins.contains_event(event_id) {
            return Err(GateDiscoveryError::MissingEvent {
                event_id: event_id.to_string(),
            });
        }
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
