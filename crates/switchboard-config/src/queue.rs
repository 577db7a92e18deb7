use std::time::Duration;

use serde::Deserialize;

/// Memory budget at or above which the larger queue defaults apply
const LARGE_MEMORY_MB: u32 = 1024;

/// Admission queue configuration
///
/// When `max_queue_size` or `max_concurrency` are omitted they are derived
/// from `memory_limit_mb`: 50 pending / 5 in flight below 1 GiB, otherwise
/// 100 pending / 10 in flight.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Memory available to this instance, used to size the defaults
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,
    /// Maximum number of pending (not yet admitted) tasks
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    /// Maximum number of tasks running at once
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Hint returned to rejected callers
    #[serde(default = "default_retry_after", deserialize_with = "duration_str::deserialize_duration")]
    pub retry_after: Duration,
}

impl QueueConfig {
    /// Effective pending-task limit
    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size.unwrap_or(if self.is_large() { 100 } else { 50 })
    }

    /// Effective concurrency limit
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(if self.is_large() { 10 } else { 5 })
    }

    const fn is_large(&self) -> bool {
        self.memory_limit_mb >= LARGE_MEMORY_MB
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: default_memory_limit_mb(),
            max_queue_size: None,
            max_concurrency: None,
            retry_after: default_retry_after(),
        }
    }
}

const fn default_memory_limit_mb() -> u32 {
    512
}

const fn default_retry_after() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_memory_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_queue_size(), 50);
        assert_eq!(config.max_concurrency(), 5);
    }

    #[test]
    fn large_memory_defaults() {
        let config = QueueConfig {
            memory_limit_mb: 2048,
            ..QueueConfig::default()
        };
        assert_eq!(config.max_queue_size(), 100);
        assert_eq!(config.max_concurrency(), 10);
    }

    #[test]
    fn explicit_limits_win() {
        let config = QueueConfig {
            memory_limit_mb: 2048,
            max_queue_size: Some(3),
            max_concurrency: Some(1),
            ..QueueConfig::default()
        };
        assert_eq!(config.max_queue_size(), 3);
        assert_eq!(config.max_concurrency(), 1);
    }
}
