use std::time::Duration;

use serde::Deserialize;

/// Circuit breaker settings for backend health tracking
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Failures that open a backend's circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long an open circuit stays open
    #[serde(default = "default_recovery_time", deserialize_with = "duration_str::deserialize_duration")]
    pub recovery_time: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_time: default_recovery_time(),
        }
    }
}

const fn default_failure_threshold() -> u32 {
    3
}

const fn default_recovery_time() -> Duration {
    Duration::from_secs(300)
}
