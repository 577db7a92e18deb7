//! OpenAI-compatible chat completion wire format

use serde::{Deserialize, Serialize};

use crate::types::{Completion, CompletionRequest, Message, Usage};

/// Chat completion request body
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl<'a> OpenAiRequest<'a> {
    pub fn new(request: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

/// Non-streaming response body
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAiResponse {
    /// Content of the first choice, if there is one
    pub fn into_completion(self) -> Option<Completion> {
        let choice = self.choices.into_iter().next()?;

        Some(Completion {
            content: choice.message.content.unwrap_or_default(),
            usage: self.usage,
        })
    }
}

/// One `data:` payload of a streamed response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChoice {
    #[serde(default)]
    pub delta: OpenAiDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAiStreamChunk {
    /// Incremental text of the first choice; empty deltas count as none
    pub fn into_delta_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}
