//! Persisted gate records: materialization, duplicate detection, and
//! assignment lookups.
//!
//! Materialization is idempotent: each winning candidate either updates the
//! existing gate it matches by identity (physical: nearest centroid within
//! the stability radius; virtual: same category) or creates a new one. Gates
//! unsupported for several consecutive passes are archived, never deleted.

use crate::geo_utils::haversine_distance;
use crate::{
    AdaptiveThresholds, CheckinEvent, DiscoveryConfig, EnforcementStrength, Gate, GateCandidate,
    GateKind, GateStatus, GateStrategy, MergeStatus, MergeSuggestion,
};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// Counts from one materialization stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterializeOutcome {
    pub created: usize,
    pub updated: usize,
    pub archived: usize,
}

/// Storage for persisted gates and pending merge suggestions.
#[derive(Debug, Default)]
pub struct GateStore {
    gates: HashMap<String, Gate>,
    suggestions: HashMap<String, Vec<MergeSuggestion>>,
    active_strategy: HashMap<String, GateStrategy>,
    next_seq: u64,
}

impl GateStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All gates for an event, ordered by id for deterministic output.
    pub fn gates_for_event(&self, event_id: &str) -> Vec<&Gate> {
        let mut gates: Vec<&Gate> = self
            .gates
            .values()
            .filter(|g| g.event_id == event_id)
            .collect();
        gates.sort_by(|a, b| a.id.cmp(&b.id));
        gates
    }

    /// Active (non-archived) gates of a given kind.
    pub fn active_gates(&self, event_id: &str, kind: GateKind) -> Vec<&Gate> {
        self.gates_for_event(event_id)
            .into_iter()
            .filter(|g| g.is_active() && g.kind == kind)
            .collect()
    }

    /// The strategy the event's current gates were materialized under.
    pub fn strategy_for(&self, event_id: &str) -> Option<GateStrategy> {
        self.active_strategy.get(event_id).copied()
    }

    /// Pending merge suggestions for an event.
    pub fn suggestions_for(&self, event_id: &str) -> &[MergeSuggestion] {
        self.suggestions
            .get(event_id)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, gate_id: &str) -> Option<&Gate> {
        self.gates.get(gate_id)
    }

    /// Materialize the winning candidate set under the chosen strategy.
    ///
    /// Existing gates of the other kind are archived (an event has at most
    /// one active strategy at a time). Gates of the same kind that no
    /// candidate supported accrue a miss and are archived once misses reach
    /// the configured limit.
    pub fn materialize(
        &mut self,
        event_id: &str,
        strategy: GateStrategy,
        candidates: &[GateCandidate],
        now: i64,
        config: &DiscoveryConfig,
    ) -> MaterializeOutcome {
        let mut outcome = MaterializeOutcome::default();
        let kind = match strategy {
            GateStrategy::Physical => GateKind::Physical,
            GateStrategy::Virtual => GateKind::Virtual,
        };

        // Strategy switch: the other kind goes inactive immediately.
        let other_kind_ids: Vec<String> = self
            .gates
            .values()
            .filter(|g| g.event_id == event_id && g.is_active() && g.kind != kind)
            .map(|g| g.id.clone())
            .collect();
        for id in other_kind_ids {
            if let Some(gate) = self.gates.get_mut(&id) {
                info!("archiving gate '{}' on strategy switch to {:?}", id, strategy);
                gate.status = GateStatus::Archived;
                outcome.archived += 1;
            }
        }

        let mut supported: HashSet<String> = HashSet::new();

        for candidate in candidates {
            if candidate.kind != kind {
                continue;
            }
            let matched = self.match_existing(event_id, candidate, &supported, config);
            match matched {
                Some(gate_id) => {
                    supported.insert(gate_id.clone());
                    self.update_gate(&gate_id, candidate, now, config);
                    outcome.updated += 1;
                }
                None => {
                    let gate_id = self.create_gate(event_id, candidate, now, config);
                    supported.insert(gate_id);
                    outcome.created += 1;
                }
            }
        }

        // Same-kind gates no candidate supported accrue a miss.
        let unsupported: Vec<String> = self
            .gates
            .values()
            .filter(|g| {
                g.event_id == event_id
                    && g.is_active()
                    && g.kind == kind
                    && !supported.contains(&g.id)
            })
            .map(|g| g.id.clone())
            .collect();
        for id in unsupported {
            if let Some(gate) = self.gates.get_mut(&id) {
                gate.misses += 1;
                if gate.misses >= config.archive_miss_limit {
                    info!(
                        "archiving gate '{}' after {} unsupported passes",
                        id, gate.misses
                    );
                    gate.status = GateStatus::Archived;
                    outcome.archived += 1;
                }
            }
        }

        self.active_strategy.insert(event_id.to_string(), strategy);
        outcome
    }

    /// Find the existing active gate this candidate re-identifies, if any.
    ///
    /// Physical: nearest active centroid within the stability radius, not
    /// already claimed this pass. Virtual: active gate of the same category.
    fn match_existing(
        &self,
        event_id: &str,
        candidate: &GateCandidate,
        claimed: &HashSet<String>,
        config: &DiscoveryConfig,
    ) -> Option<String> {
        match candidate.kind {
            GateKind::Physical => {
                let centroid = candidate.centroid?;
                self.active_gates(event_id, GateKind::Physical)
                    .into_iter()
                    .filter(|g| !claimed.contains(&g.id))
                    .filter_map(|g| {
                        let gate_centroid = g.centroid?;
                        let d = haversine_distance(&centroid, &gate_centroid);
                        (d <= config.stability_radius_meters).then_some((g.id.clone(), d))
                    })
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(id, _)| id)
            }
            GateKind::Virtual => {
                let category = candidate.dominant_category()?;
                self.active_gates(event_id, GateKind::Virtual)
                    .into_iter()
                    .filter(|g| !claimed.contains(&g.id))
                    .find(|g| g.dominant_category.as_deref() == Some(category))
                    .map(|g| g.id.clone())
            }
        }
    }

    fn update_gate(&mut self, gate_id: &str, candidate: &GateCandidate, now: i64, config: &DiscoveryConfig) {
        let radius = detection_radius(candidate, config);
        let dominant = candidate.dominant_category().map(str::to_string);

        if let Some(gate) = self.gates.get_mut(gate_id) {
            gate.centroid = candidate.centroid;
            gate.detection_radius_meters = radius;
            gate.dominant_category = dominant;
            gate.confidence = candidate.confidence;
            gate.enforcement = EnforcementStrength::from_confidence(candidate.confidence);
            gate.member_count = candidate.member_count;
            gate.last_recomputed_at = now;
            gate.misses = 0;

            // Monotone promotion as confidence bands are sustained.
            gate.status = match gate.status {
                GateStatus::Candidate if candidate.confidence >= 0.65 => GateStatus::Probation,
                GateStatus::Probation if candidate.confidence >= 0.75 => GateStatus::Confirmed,
                status => status,
            };
            debug!(
                "updated gate '{}': confidence {:.2}, {} members",
                gate_id, candidate.confidence, candidate.member_count
            );
        }
    }

    fn create_gate(
        &mut self,
        event_id: &str,
        candidate: &GateCandidate,
        now: i64,
        config: &DiscoveryConfig,
    ) -> String {
        self.next_seq += 1;
        let gate_id = format!("gate-{}-{}", event_id, self.next_seq);

        let name = match candidate.kind {
            GateKind::Physical => format!("Gate {}", self.next_seq),
            GateKind::Virtual => format!(
                "{} (virtual)",
                candidate.dominant_category().unwrap_or("uncategorized")
            ),
        };

        let gate = Gate {
            id: gate_id.clone(),
            event_id: event_id.to_string(),
            kind: candidate.kind,
            name,
            centroid: candidate.centroid,
            detection_radius_meters: detection_radius(candidate, config),
            dominant_category: candidate.dominant_category().map(str::to_string),
            confidence: candidate.confidence,
            enforcement: EnforcementStrength::from_confidence(candidate.confidence),
            status: GateStatus::Candidate,
            member_count: candidate.member_count,
            created_at: now,
            last_recomputed_at: now,
            misses: 0,
        };

        info!(
            "created {:?} gate '{}' ({} members, confidence {:.2})",
            candidate.kind, gate.name, candidate.member_count, candidate.confidence
        );
        self.gates.insert(gate_id.clone(), gate);
        gate_id
    }

    /// Best gate for an unassigned check-in under the active strategy.
    ///
    /// Physical: nearest active gate whose assignment radius covers the
    /// check-in's position (check-ins without usable GPS stay orphaned).
    /// Virtual: the active gate matching the check-in's category.
    pub fn find_assignment(
        &self,
        event_id: &str,
        checkin: &CheckinEvent,
        strategy: GateStrategy,
        config: &DiscoveryConfig,
    ) -> Option<&Gate> {
        match strategy {
            GateStrategy::Physical => {
                let gps = checkin.gps.as_ref()?;
                if !crate::quality::is_valid_gps(gps) {
                    return None;
                }
                let point = gps.point();
                self.active_gates(event_id, GateKind::Physical)
                    .into_iter()
                    .filter_map(|g| {
                        let centroid = g.centroid?;
                        let d = haversine_distance(&point, &centroid);
                        let bound = g
                            .detection_radius_meters
                            .max(config.min_assignment_radius_meters);
                        (d <= bound).then_some((g, d))
                    })
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(g, _)| g)
            }
            GateStrategy::Virtual => self
                .active_gates(event_id, GateKind::Virtual)
                .into_iter()
                .find(|g| g.dominant_category.as_deref() == Some(checkin.category.as_str())),
        }
    }

    /// Compare every pair of active physical gates and refresh the event's
    /// merge suggestions. Existing resolutions for unchanged pairs carry
    /// over; suggestions are advisory, nothing is merged here.
    pub fn detect_duplicates(
        &mut self,
        event_id: &str,
        thresholds: &AdaptiveThresholds,
    ) -> usize {
        let gates = self.active_gates(event_id, GateKind::Physical);

        let mut fresh: Vec<MergeSuggestion> = Vec::new();
        for (i, a) in gates.iter().enumerate() {
            for b in gates.iter().skip(i + 1) {
                let (Some(ca), Some(cb)) = (a.centroid, b.centroid) else {
                    continue;
                };
                let distance = haversine_distance(&ca, &cb);
                if distance >= thresholds.duplicate_distance_meters {
                    continue;
                }

                let closeness = 1.0 - distance / thresholds.duplicate_distance_meters;
                let category_overlap = match (&a.dominant_category, &b.dominant_category) {
                    (Some(x), Some(y)) if x == y => 1.0,
                    _ => 0.0,
                };
                let confidence = (0.7 * closeness + 0.3 * category_overlap).clamp(0.0, 1.0);

                fresh.push(MergeSuggestion {
                    gate_id_a: a.id.clone(),
                    gate_id_b: b.id.clone(),
                    distance_meters: distance,
                    confidence,
                    status: MergeStatus::Pending,
                });
            }
        }

        // Preserve operator resolutions for pairs that still exist.
        if let Some(previous) = self.suggestions.get(event_id) {
            for suggestion in &mut fresh {
                if let Some(old) = previous.iter().find(|p| {
                    p.gate_id_a == suggestion.gate_id_a && p.gate_id_b == suggestion.gate_id_b
                }) {
                    suggestion.status = old.status;
                }
            }
        }

        let pending = fresh
            .iter()
            .filter(|s| s.status == MergeStatus::Pending)
            .count();
        self.suggestions.insert(event_id.to_string(), fresh);
        pending
    }

    /// Resolve a pending suggestion. On approval the second gate is archived
    /// and its id returned so the caller can re-assign its check-ins.
    pub fn resolve_suggestion(
        &mut self,
        event_id: &str,
        gate_id_a: &str,
        gate_id_b: &str,
        approve: bool,
    ) -> Option<String> {
        let suggestions = self.suggestions.get_mut(event_id)?;
        let suggestion = suggestions
            .iter_mut()
            .find(|s| s.gate_id_a == gate_id_a && s.gate_id_b == gate_id_b)?;

        if !approve {
            suggestion.status = MergeStatus::Rejected;
            return None;
        }

        suggestion.status = MergeStatus::Approved;
        if let Some(gate) = self.gates.get_mut(gate_id_b) {
            info!("archiving gate '{}' merged into '{}'", gate_id_b, gate_id_a);
            gate.status = GateStatus::Archived;
        }
        Some(gate_id_b.to_string())
    }
}

/// Assignment radius for a materialized gate, derived from the candidate's
/// reported accuracy (twice the mean, clamped to a sane venue-scale range).
fn detection_radius(candidate: &GateCandidate, config: &DiscoveryConfig) -> f64 {
    match candidate.accuracy_mean {
        Some(mean) => (mean * 2.0).clamp(10.0, 150.0),
        None => config.min_assignment_radius_meters,
    }
}
