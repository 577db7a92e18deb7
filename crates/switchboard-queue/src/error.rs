use std::time::Duration;

use thiserror::Error;

/// Admission queue errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The waiting line is full
    #[error("server overloaded, retry after {}s", retry_after.as_secs())]
    Overloaded {
        /// Hint for when the caller may try again
        retry_after: Duration,
    },

    /// The task was admitted but finished without a result, e.g. it panicked
    #[error("queued task ended without producing a result")]
    Abandoned,
}
