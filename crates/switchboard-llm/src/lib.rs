//! Request orchestration for Switchboard
//!
//! Classifies a conversation, picks a backend, calls the upstream
//! completion service with retries and relays streamed output. Every call
//! runs inside the admission queue.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod types;
pub mod upstream;

pub use dispatch::{Dispatcher, DispatcherStatus};
pub use error::LlmError;
pub use relay::{RelayEvent, RelayStream};
pub use types::{Completion, CompletionRequest, DispatchInput, DispatchResponse, Message, Role, Usage};
pub use upstream::{ByteStream, Upstream};
