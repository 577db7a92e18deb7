use std::time::Duration;

use http::StatusCode;
use switchboard_core::HttpError;
use switchboard_queue::QueueError;
use switchboard_routing::IntentCategory;
use thiserror::Error;

/// Errors surfaced by the dispatcher
#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or empty input; never retried
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The admission queue is full
    #[error("server overloaded, retry after {}s", retry_after.as_secs())]
    Overloaded {
        /// Hint for when the caller may try again
        retry_after: Duration,
    },

    /// Non-success response, transport failure, timeout or undecodable body
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Every attempt failed; carries the last attempt's error
    #[error("all {attempts} attempts failed for {category} request: {source}")]
    AllRetriesExhausted {
        category: IntentCategory,
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },

    /// Failure while relaying a stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<QueueError> for LlmError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Overloaded { retry_after } => Self::Overloaded { retry_after },
            QueueError::Abandoned => Self::Internal(anyhow::anyhow!(error)),
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Overloaded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) | Self::AllRetriesExhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::Streaming(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Overloaded { .. } => "overloaded_error",
            Self::Upstream(_) => "upstream_error",
            Self::AllRetriesExhausted { .. } => "all_retries_exhausted",
            Self::Streaming(_) => "streaming_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Overloaded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
