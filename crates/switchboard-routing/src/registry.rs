//! Backend pools per intent category
//!
//! Built once from configuration and immutable afterwards.

use std::sync::Arc;

use switchboard_config::{BackendConfig, PoolsConfig};

use crate::error::RoutingError;
use crate::intent::IntentCategory;

/// An upstream model and the sampling parameters used with it
#[derive(Debug, Clone, PartialEq)]
pub struct BackendDescriptor {
    /// Model identifier sent upstream
    pub id: String,
    /// 1 is the most preferred
    pub priority: u32,
    /// Completion token cap
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

impl From<&BackendConfig> for BackendDescriptor {
    fn from(config: &BackendConfig) -> Self {
        Self {
            id: config.id.clone(),
            priority: config.priority,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Ordered backend lists for every category
///
/// List order is the tie-break order between otherwise equal backends. The
/// same id may appear in several categories with different parameters.
#[derive(Debug, Clone)]
pub struct BackendPool {
    pools: [Arc<[BackendDescriptor]>; IntentCategory::COUNT],
}

impl BackendPool {
    /// Build the pool from configuration
    ///
    /// The `general` list is the fallback for every other category and must
    /// not be empty.
    pub fn from_config(config: &PoolsConfig) -> Result<Self, RoutingError> {
        if config.general.is_empty() {
            return Err(RoutingError::EmptyFallbackPool);
        }

        let build = |list: &[BackendConfig]| -> Arc<[BackendDescriptor]> {
            list.iter().map(BackendDescriptor::from).collect()
        };

        // indexed by IntentCategory declaration order
        let pools = [
            build(&config.coding),
            build(&config.math),
            build(&config.creative),
            build(&config.reasoning),
            build(&config.general),
        ];

        Ok(Self { pools })
    }

    /// Backends configured for `category`, falling back to `general` when the
    /// category has none
    pub fn backends(&self, category: IntentCategory) -> &[BackendDescriptor] {
        let list = &self.pools[category.index()];

        if list.is_empty() {
            self.fallback()
        } else {
            list
        }
    }

    /// The `general` pool
    pub fn fallback(&self) -> &[BackendDescriptor] {
        &self.pools[IntentCategory::General.index()]
    }

    /// Last-resort backend used when nothing is healthy
    pub fn last_resort(&self) -> &BackendDescriptor {
        // non-empty, checked in from_config
        &self.fallback()[0]
    }

    /// Every distinct backend id, in first-seen order
    pub fn backend_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();

        for backend in self.pools.iter().flat_map(|list| list.iter()) {
            if !ids.contains(&backend.id.as_str()) {
                ids.push(&backend.id);
            }
        }

        ids
    }
}
