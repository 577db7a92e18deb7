//! Backend selection strategies

use std::sync::Arc;

use switchboard_config::SelectionStrategy;

use crate::health::HealthRegistry;
use crate::intent::IntentCategory;
use crate::registry::BackendDescriptor;

pub mod round_robin;
pub mod weighted;

use self::round_robin::RoundRobin;

/// Picks one backend for a category from the currently healthy candidates
///
/// The strategy is fixed at construction. When no candidate is healthy the
/// first backend of the `general` pool is returned regardless of its health.
#[derive(Debug)]
pub struct BackendSelector {
    health: Arc<HealthRegistry>,
    strategy: SelectionStrategy,
    round_robin: RoundRobin,
}

impl BackendSelector {
    pub fn new(health: Arc<HealthRegistry>, strategy: SelectionStrategy) -> Self {
        Self {
            health,
            strategy,
            round_robin: RoundRobin::default(),
        }
    }

    /// Strategy this selector was built with
    pub const fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Choose a backend for `category`
    pub fn select(&self, category: IntentCategory) -> BackendDescriptor {
        let healthy = self.health.healthy_backends(category);

        let Some(first) = healthy.first() else {
            let fallback = self.health.pool().last_resort();
            tracing::warn!(
                %category,
                backend = %fallback.id,
                "no healthy backends, using last-resort fallback"
            );
            return fallback.clone();
        };

        let chosen = match self.strategy {
            SelectionStrategy::Priority => *first,
            SelectionStrategy::RoundRobin => *self.round_robin.pick(category, &healthy),
            SelectionStrategy::HealthAwareRoundRobin => weighted::pick(&healthy, &self.health),
        };

        tracing::debug!(
            %category,
            backend = %chosen.id,
            strategy = %self.strategy,
            candidates = healthy.len(),
            "backend selected"
        );

        chosen.clone()
    }
}
