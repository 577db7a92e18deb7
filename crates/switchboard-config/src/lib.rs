#![allow(clippy::must_use_candidate)]

pub mod dispatch;
mod env;
pub mod health;
mod loader;
pub mod pools;
pub mod queue;
pub mod selection;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use dispatch::*;
pub use health::*;
pub use pools::*;
pub use queue::*;
pub use selection::*;
pub use telemetry::TelemetryConfig;
pub use upstream::*;

/// Top-level Switchboard configuration
///
/// Built once at startup and handed by reference to the health registry,
/// the selector and the admission queue.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Upstream completion service
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Retry behaviour of the orchestrator
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Admission queue limits
    #[serde(default)]
    pub queue: QueueConfig,
    /// Circuit breaker settings
    #[serde(default)]
    pub health: HealthConfig,
    /// Backend selection strategy
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Backend pools per intent category
    #[serde(default)]
    pub pools: PoolsConfig,
    /// Logging and telemetry
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
