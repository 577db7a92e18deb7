//! Routing-specific error types

use thiserror::Error;

/// Errors raised while building the routing tables
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The fallback pool has no backends, so selection could fail
    #[error("the general pool is empty; it is required as the last-resort fallback")]
    EmptyFallbackPool,
}
