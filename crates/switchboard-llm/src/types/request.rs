use serde::Deserialize;
use switchboard_routing::BackendDescriptor;

use super::message::Message;
use crate::error::LlmError;

/// What a caller asks the dispatcher to complete
///
/// Deserializes from `{"messages": [...]}` or `{"prompt": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchInput {
    /// Full conversation history, most recent last
    Messages(Vec<Message>),
    /// A single prompt, sent as one user message
    Prompt(String),
}

impl DispatchInput {
    /// Validate and normalize into a conversation
    pub fn into_messages(self) -> Result<Vec<Message>, LlmError> {
        let messages = match self {
            Self::Messages(messages) => messages,
            Self::Prompt(prompt) => vec![Message::user(prompt)],
        };

        match messages.last() {
            None => Err(LlmError::InvalidRequest("messages or prompt required".to_owned())),
            Some(last) if last.content.trim().is_empty() => {
                Err(LlmError::InvalidRequest("the last message has no content".to_owned()))
            }
            Some(_) => Ok(messages),
        }
    }
}

/// A call to one upstream backend
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Upstream model identifier
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Request `backend` to continue `messages`
    pub fn for_backend(backend: &BackendDescriptor, messages: &[Message]) -> Self {
        Self {
            model: backend.id.clone(),
            messages: messages.to_vec(),
            temperature: backend.temperature,
            max_tokens: backend.max_tokens,
        }
    }
}
