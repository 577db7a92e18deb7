//! Bounded-concurrency admission queue for Switchboard
//!
//! Tasks wait in FIFO order until a concurrency slot frees. When the waiting
//! line is full new work is rejected immediately instead of blocking.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod queue;

pub use error::QueueError;
pub use queue::{AdmissionQueue, QueueStats};
