//! Programmatic configuration builder for integration tests

use std::time::Duration;

use secrecy::SecretString;
use switchboard_config::{BackendConfig, Config, PoolsConfig, SelectionStrategy};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Point at a mock upstream, with one general backend and fast retries
    pub fn new(base_url: &str) -> Self {
        let mut config = Config::default();

        config.upstream.base_url = base_url.parse().expect("valid URL");
        config.upstream.api_key = Some(SecretString::from("test-key"));
        config.upstream.request_timeout = Duration::from_secs(5);
        config.dispatch.retry_backoff = Duration::from_millis(10);
        config.selection.strategy = SelectionStrategy::Priority;
        config.pools = PoolsConfig {
            coding: Vec::new(),
            math: Vec::new(),
            creative: Vec::new(),
            reasoning: Vec::new(),
            general: backends(&["generalist"]),
        };

        Self { config }
    }

    /// Replace the general pool
    pub fn with_general(mut self, ids: &[&str]) -> Self {
        self.config.pools.general = backends(ids);
        self
    }

    /// Replace the coding pool
    pub fn with_coding(mut self, ids: &[&str]) -> Self {
        self.config.pools.coding = backends(ids);
        self
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.config.selection.strategy = strategy;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.dispatch.max_retries = max_retries;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.config.health.failure_threshold = threshold;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.upstream.request_timeout = timeout;
        self
    }

    /// Set explicit queue limits
    pub fn with_queue(mut self, max_queue_size: usize, max_concurrency: usize) -> Self {
        self.config.queue.max_queue_size = Some(max_queue_size);
        self.config.queue.max_concurrency = Some(max_concurrency);
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

/// Backends in priority order
fn backends(ids: &[&str]) -> Vec<BackendConfig> {
    ids.iter()
        .zip(1..)
        .map(|(id, priority)| BackendConfig {
            id: (*id).to_owned(),
            priority,
            max_tokens: 256,
            temperature: 0.5,
        })
        .collect()
}
