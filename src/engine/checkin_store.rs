//! Check-in storage with per-event counters and snapshots.
//!
//! The ingestion write path is an O(1) append plus a counter bump; it never
//! triggers clustering inline. Recompute passes operate on a snapshot taken
//! at start time — check-ins arriving mid-pass are picked up by the next
//! pass.

use crate::CheckinEvent;
use std::collections::HashMap;

/// Storage for check-in events, grouped by event.
#[derive(Debug, Default)]
pub struct CheckinStore {
    by_event: HashMap<String, Vec<CheckinEvent>>,
    ingested: HashMap<String, u64>,
}

impl CheckinStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            by_event: HashMap::new(),
            ingested: HashMap::new(),
        }
    }

    /// Append a check-in. Returns the event's total ingested count.
    pub fn add(&mut self, checkin: CheckinEvent) -> u64 {
        let event_id = checkin.event_id.clone();
        self.by_event.entry(event_id.clone()).or_default().push(checkin);
        let counter = self.ingested.entry(event_id).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Whether any check-ins exist for the event.
    pub fn contains_event(&self, event_id: &str) -> bool {
        self.by_event.contains_key(event_id)
    }

    /// Total check-ins ever ingested for the event.
    pub fn ingested_count(&self, event_id: &str) -> u64 {
        self.ingested.get(event_id).copied().unwrap_or(0)
    }

    /// All known event ids.
    pub fn event_ids(&self) -> Vec<String> {
        self.by_event.keys().cloned().collect()
    }

    /// Clone the event's check-ins as a point-in-time snapshot.
    pub fn snapshot(&self, event_id: &str) -> Vec<CheckinEvent> {
        self.by_event.get(event_id).cloned().unwrap_or_default()
    }

    /// Check-ins of the event currently lacking a gate reference.
    pub fn unassigned(&self, event_id: &str) -> Vec<CheckinEvent> {
        self.by_event
            .get(event_id)
            .map(|checkins| {
                checkins
                    .iter()
                    .filter(|c| c.gate_id.is_none())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count of check-ins currently lacking a gate reference.
    pub fn unassigned_count(&self, event_id: &str) -> usize {
        self.by_event
            .get(event_id)
            .map(|checkins| checkins.iter().filter(|c| c.gate_id.is_none()).count())
            .unwrap_or(0)
    }

    /// Set the gate reference on one check-in. Returns false if not found.
    pub fn assign_gate(&mut self, event_id: &str, checkin_id: &str, gate_id: &str) -> bool {
        if let Some(checkins) = self.by_event.get_mut(event_id) {
            if let Some(checkin) = checkins.iter_mut().find(|c| c.id == checkin_id) {
                checkin.gate_id = Some(gate_id.to_string());
                return true;
            }
        }
        false
    }

    /// Explicitly re-assign every check-in referencing `from_gate` to
    /// `to_gate` (merge resolution). Returns the number moved.
    pub fn reassign_gate(&mut self, event_id: &str, from_gate: &str, to_gate: &str) -> usize {
        let mut moved = 0;
        if let Some(checkins) = self.by_event.get_mut(event_id) {
            for checkin in checkins.iter_mut() {
                if checkin.gate_id.as_deref() == Some(from_gate) {
                    checkin.gate_id = Some(to_gate.to_string());
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Remove all state for an event.
    pub fn clear_event(&mut self, event_id: &str) {
        self.by_event.remove(event_id);
        self.ingested.remove(event_id);
    }
}
