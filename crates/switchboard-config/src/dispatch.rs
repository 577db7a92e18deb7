use std::time::Duration;

use serde::Deserialize;

/// Retry settings for the request orchestrator
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Linear backoff unit; attempt `n` waits `retry_backoff * (n + 1)`
    #[serde(default = "default_retry_backoff", deserialize_with = "duration_str::deserialize_duration")]
    pub retry_backoff: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_retry_backoff() -> Duration {
    Duration::from_secs(1)
}
