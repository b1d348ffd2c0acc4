//! Unified error handling for the gate discovery engine.
//!
//! Error taxonomy:
//! - `MissingEvent` — malformed or unknown event identifier; fatal to the
//!   single pass, surfaced immediately.
//! - `Computation` — numerical failure scoped to one candidate; the candidate
//!   is dropped, the pass continues.
//! - `PassInProgress` — another pass for the same event is already running;
//!   the new trigger is deferred, not a failure.
//!
//! Insufficient data is never an error: it comes back as a
//! [`QualityReport`](crate::QualityReport) recommendation to wait.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GateDiscoveryError>;

/// Errors produced by the gate discovery engine.
#[derive(Debug, Error)]
pub enum GateDiscoveryError {
    /// The event identifier is empty or unknown to the engine.
    #[error("unknown or empty event id '{event_id}'")]
    MissingEvent { event_id: String },

    /// A per-candidate numerical failure (e.g. a degenerate centroid with
    /// zero samples). Callers drop the candidate and continue the pass.
    #[error("computation failed: {context}")]
    Computation { context: String },

    /// A pass for this event is already running; the trigger is deferred.
    #[error("a discovery pass for event '{event_id}' is already in progress")]
    PassInProgress { event_id: String },
}

impl GateDiscoveryError {
    /// Shorthand for a per-candidate computation failure.
    pub fn computation(context: impl Into<String>) -> Self {
        Self::Computation {
            context: context.into(),
        }
    }
}

/// Extension trait for converting empty options into engine errors.
pub trait OptionExt<T> {
    /// Convert `None` into a `Computation` error with the given context.
    fn ok_or_computation(self, context: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_computation(self, context: &str) -> Result<T> {
        self.ok_or_else(|| GateDiscoveryError::computation(context))
    }
}
