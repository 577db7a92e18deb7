//! Health-aware weighted random selection
//!
//! Each candidate is weighted by success rate, response time and priority,
//! then one is drawn by cumulative weight.

use rand::Rng;

use crate::health::{BackendHealth, HealthRegistry};
use crate::registry::BackendDescriptor;

/// Priority at or above which a backend gets no weight
const PRIORITY_CEILING: u32 = 4;

/// Selection weight of one backend
///
/// Before any request the success rate counts as 1, and before any latency
/// sample the response-time factor counts as 1.
pub fn weight(backend: &BackendDescriptor, health: Option<&BackendHealth>) -> f64 {
    let success_rate = health.and_then(BackendHealth::success_rate).unwrap_or(1.0);

    let avg_ms = health.map_or(0.0, |h| h.avg_response_time_ms);
    let latency_factor = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 1.0 };

    let priority_factor = f64::from(PRIORITY_CEILING.saturating_sub(backend.priority));

    success_rate * latency_factor * priority_factor
}

/// Index chosen by `draw` against the cumulative weights
///
/// `draw` is expected in `[0, total)`. Falls back to index 0 when nothing
/// matches.
pub fn weighted_pick(weights: &[f64], draw: f64) -> usize {
    let mut cumulative = 0.0;

    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if draw < cumulative {
            return index;
        }
    }

    0
}

/// Draw one candidate; `candidates` must not be empty
pub fn pick<'a>(candidates: &[&'a BackendDescriptor], health: &HealthRegistry) -> &'a BackendDescriptor {
    let weights: Vec<f64> = candidates
        .iter()
        .map(|backend| weight(backend, health.stats(&backend.id).as_ref()))
        .collect();

    let total: f64 = weights.iter().sum();

    if !total.is_finite() || total <= 0.0 {
        tracing::debug!(total, "degenerate selection weights, using first candidate");
        return candidates[0];
    }

    let draw = rand::rng().random_range(0.0..total);
    candidates[weighted_pick(&weights, draw)]
}
