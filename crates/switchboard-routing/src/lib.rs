//! Intent-aware backend routing for Switchboard
//!
//! - **Intent**: keyword-weighted classification of a prompt into a category
//! - **Registry**: the per-category backend pools
//! - **Health**: per-backend statistics with a lazily expiring circuit breaker
//! - **Strategy**: picks one backend from the healthy candidates

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod error;
pub mod health;
pub mod intent;
mod keywords;
pub mod registry;
pub mod strategy;

pub use error::RoutingError;
pub use health::{BackendHealth, CircuitState, Clock, HealthRegistry, HealthSnapshot, ManualClock, SystemClock};
pub use intent::{IntentCategory, classify, classify_scores};
pub use registry::{BackendDescriptor, BackendPool};
pub use strategy::BackendSelector;
