//! Upstream completion service clients

mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

pub use self::openai::OpenAiUpstream;
use crate::error::LlmError;
use crate::types::{Completion, CompletionRequest};

/// Raw body of a streamed response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// A completion service the dispatcher can call
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Open a streamed completion and return its raw body
    ///
    /// Succeeds once the response headers arrive with a success status.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<ByteStream, LlmError>;
}
