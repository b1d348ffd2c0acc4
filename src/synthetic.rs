//! Synthetic check-in generator for testing and benchmarking.
//!
//! Generates event check-in sets around known gate positions, providing
//! ground truth for validating the discovery pipeline.
//!
//! # Example
//!
//! ```rust
//! use gatefind::synthetic::{CheckinScenario, GateLayout};
//! use gatefind::GeoPoint;
//!
//! let scenario = CheckinScenario {
//!     event_id: "festival".to_string(),
//!     layout: Some(GateLayout {
//!         origin: GeoPoint::new(47.37, 8.55),
//!         gate_count: 2,
//!         separation_meters: 200.0,
//!     }),
//!     checkin_count: 60,
//!     categories: vec!["general".to_string()],
//!     accuracy_meters: 10.0,
//!     gps_noise_sigma_meters: 0.0,
//!     no_gps_fraction: 0.0,
//!     span_secs: 7200,
//!     start_timestamp: 1_700_000_000,
//!     seed: 42,
//! };
//!
//! let data = scenario.generate();
//! assert_eq!(data.checkins.len(), 60);
//! assert_eq!(data.expected_gates.len(), 2);
//! ```

use crate::{CheckinEvent, GeoPoint, GpsSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Physical layout of the gates to simulate.
#[derive(Debug, Clone)]
pub struct GateLayout {
    /// Position of the first gate.
    pub origin: GeoPoint,
    /// Number of gates.
    pub gate_count: usize,
    /// Spacing between consecutive gates, in meters (laid out eastward).
    pub separation_meters: f64,
}

/// Configuration for one synthetic event's check-in stream.
#[derive(Debug, Clone)]
pub struct CheckinScenario {
    pub event_id: String,
    /// Gate layout; `None` generates an event with no GPS at all.
    pub layout: Option<GateLayout>,
    /// Total check-ins to generate.
    pub checkin_count: usize,
    /// Category labels, assigned round-robin.
    pub categories: Vec<String>,
    /// Reported accuracy radius attached to every GPS sample.
    pub accuracy_meters: f64,
    /// Positional noise amplitude in meters (0 = exactly at the gate).
    pub gps_noise_sigma_meters: f64,
    /// Fraction of check-ins generated without any GPS.
    pub no_gps_fraction: f64,
    /// Wall-clock span the check-ins cover, in seconds.
    pub span_secs: i64,
    /// Unix timestamp of the first check-in.
    pub start_timestamp: i64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// A generated check-in set plus its ground truth.
#[derive(Debug, Clone)]
pub struct ScenarioData {
    pub checkins: Vec<CheckinEvent>,
    /// True gate positions (empty for no-GPS scenarios).
    pub expected_gates: Vec<GeoPoint>,
}

impl CheckinScenario {
    /// Generate the check-in stream. Deterministic for a given seed.
    pub fn generate(&self) -> ScenarioData {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let expected_gates: Vec<GeoPoint> = match &self.layout {
            Some(layout) => (0..layout.gate_count)
                .map(|i| offset_east(&layout.origin, i as f64 * layout.separation_meters))
                .collect(),
            None => Vec::new(),
        };

        let step = if self.checkin_count > 1 {
            self.span_secs / (self.checkin_count as i64 - 1).max(1)
        } else {
            0
        };

        let checkins = (0..self.checkin_count)
            .map(|i| {
                let category = if self.categories.is_empty() {
                    "general".to_string()
                } else {
                    self.categories[i % self.categories.len()].clone()
                };

                let gps = if expected_gates.is_empty() || rng.gen::<f64>() < self.no_gps_fraction
                {
                    None
                } else {
                    let gate = &expected_gates[i % expected_gates.len()];
                    let point = jitter(gate, self.gps_noise_sigma_meters, &mut rng);
                    Some(GpsSample::new(
                        point.latitude,
                        point.longitude,
                        self.accuracy_meters,
                    ))
                };

                CheckinEvent {
                    id: format!("chk-{}-{}", self.event_id, i),
                    event_id: self.event_id.clone(),
                    attendee_id: format!("wb-{:05}", i),
                    category,
                    timestamp: self.start_timestamp + step * i as i64,
                    gps,
                    gate_id: None,
                }
            })
            .collect();

        ScenarioData {
            checkins,
            expected_gates,
        }
    }
}

/// Move a point east by a meter offset.
fn offset_east(origin: &GeoPoint, meters: f64) -> GeoPoint {
    let lng_per_meter = 1.0 / (111_000.0 * origin.latitude.to_radians().cos().abs().max(0.01));
    GeoPoint::new(origin.latitude, origin.longitude + meters * lng_per_meter)
}

/// Apply uniform positional noise of the given amplitude.
fn jitter(point: &GeoPoint, sigma_meters: f64, rng: &mut StdRng) -> GeoPoint {
    if sigma_meters <= 0.0 {
        return *point;
    }
    let lat_deg = sigma_meters / 111_000.0;
    let lng_deg = sigma_meters / (111_000.0 * point.latitude.to_radians().cos().abs().max(0.01));
    GeoPoint::new(
        point.latitude + rng.gen_range(-lat_deg..lat_deg),
        point.longitude + rng.gen_range(-lng_deg..lng_deg),
    )
}
