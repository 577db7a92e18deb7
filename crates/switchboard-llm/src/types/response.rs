use serde::{Deserialize, Serialize};
use switchboard_routing::IntentCategory;

/// Token usage reported by the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Result of one successful upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Result of a non-streaming dispatch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub success: bool,
    /// Backend that produced the answer
    pub backend_id: String,
    pub category: IntentCategory,
    /// Zero-based attempt that succeeded
    pub attempt: u32,
    pub content: String,
    pub usage: Option<Usage>,
}
