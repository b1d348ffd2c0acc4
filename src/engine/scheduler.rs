//! Recompute scheduling decoupled from the ingestion write path.
//!
//! Full discovery passes are keyed off check-in volume milestones: an initial
//! pass once a minimum volume arrives, a refresh every N further check-ins,
//! and orphan-assignment sweeps on a tighter cadence. At most one pass runs
//! per event at a time; concurrent triggers for the same event are deferred
//! and coalesced, never run in parallel. Passes for different events are
//! independent.
//!
//! A stuck pass is bounded by a timeout, after which the lock may be taken
//! over by the next trigger.

use crate::error::{GateDiscoveryError, Result};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// What kind of background pass is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Full pipeline: cluster, score, arbitrate, materialize, assign, detect
    Full,
    /// Orphan assignment only, against existing gates
    OrphanSweep,
}

/// Milestone policy configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Check-in count that triggers the first full pass.
    /// Default: 10
    pub initial_pass_at: u64,

    /// Additional check-ins between full refresh passes.
    /// Default: 25
    pub refresh_interval: u64,

    /// Additional check-ins between orphan sweeps.
    /// Default: 10
    pub orphan_sweep_interval: u64,

    /// A pass older than this is considered stuck and its lock reclaimable.
    /// Default: 60 seconds
    pub pass_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_pass_at: 10,
            refresh_interval: 25,
            orphan_sweep_interval: 10,
            pass_timeout: Duration::from_secs(60),
        }
    }
}

/// Decides when passes run and serializes them per event.
#[derive(Debug, Default)]
pub struct RecomputeScheduler {
    config: SchedulerConfig,
    /// Ingested count at the last completed full pass
    last_full_at: HashMap<String, u64>,
    /// Ingested count at the last completed sweep (full passes count too)
    last_sweep_at: HashMap<String, u64>,
    /// Events with a pass currently running, with its start time
    running: HashMap<String, Instant>,
    /// Events whose trigger arrived while a pass was running
    deferred: HashSet<String>,
}

impl RecomputeScheduler {
    /// Create a scheduler with default milestones.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            last_full_at: HashMap::new(),
            last_sweep_at: HashMap::new(),
            running: HashMap::new(),
            deferred: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// What pass, if any, is due for an event at its current ingested count.
    ///
    /// Pure decision; does not take the lock.
    pub fn due(&self, event_id: &str, ingested: u64) -> Option<PassKind> {
        match self.last_full_at.get(event_id) {
            None => {
                if ingested >= self.config.initial_pass_at {
                    return Some(PassKind::Full);
                }
            }
            Some(&at_full) => {
                if ingested - at_full >= self.config.refresh_interval {
                    return Some(PassKind::Full);
                }
                let at_sweep = self.last_sweep_at.get(event_id).copied().unwrap_or(at_full);
                if ingested - at_sweep >= self.config.orphan_sweep_interval {
                    return Some(PassKind::OrphanSweep);
                }
            }
        }
        None
    }

    /// Take the event's execution lock.
    ///
    /// If a pass is already running and has not exceeded the timeout, the
    /// trigger is recorded as deferred and `PassInProgress` is returned — a
    /// deferral, not a failure. A timed-out pass is abandoned and its lock
    /// taken over.
    pub fn begin(&mut self, event_id: &str) -> Result<()> {
        if let Some(started) = self.running.get(event_id) {
            if started.elapsed() < self.config.pass_timeout {
                debug!("pass already running for '{}', deferring trigger", event_id);
                self.deferred.insert(event_id.to_string());
                return Err(GateDiscoveryError::PassInProgress {
                    event_id: event_id.to_string(),
                });
            }
            warn!(
                "pass for '{}' exceeded timeout ({:?}), abandoning and retrying",
                event_id, self.config.pass_timeout
            );
        }
        self.running.insert(event_id.to_string(), Instant::now());
        Ok(())
    }

    /// Release the lock and record the milestone the pass covered.
    pub fn finish(&mut self, event_id: &str, kind: PassKind, ingested_at_snapshot: u64) {
        self.running.remove(event_id);
        match kind {
            PassKind::Full => {
                self.last_full_at
                    .insert(event_id.to_string(), ingested_at_snapshot);
                self.last_sweep_at
                    .insert(event_id.to_string(), ingested_at_snapshot);
            }
            PassKind::OrphanSweep => {
                self.last_sweep_at
                    .insert(event_id.to_string(), ingested_at_snapshot);
            }
        }
    }

    /// Release the lock without recording progress (failed pass; the next
    /// trigger retries the same milestone).
    pub fn abandon(&mut self, event_id: &str) {
        self.running.remove(event_id);
    }

    /// Whether a pass is currently running for the event.
    pub fn is_running(&self, event_id: &str) -> bool {
        self.running.contains_key(event_id)
    }

    /// Drain the events whose triggers were deferred while a pass ran.
    /// Coalesced: an event appears at most once regardless of trigger count.
    pub fn take_deferred(&mut self) -> Vec<String> {
        let mut events: Vec<String> = self.deferred.drain().collect();
        events.sort_unstable();
        events
    }
}
