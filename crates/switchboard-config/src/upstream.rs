use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Default OpenAI-compatible endpoint (`OpenRouter`)
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Connection settings for the upstream completion service
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Sent as `HTTP-Referer`
    #[serde(default)]
    pub app_url: Option<String>,
    /// Sent as `X-Title`
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Overall deadline for a non-streaming call, and for the response
    /// headers of a streaming call
    #[serde(default = "default_request_timeout", deserialize_with = "duration_str::deserialize_duration")]
    pub request_timeout: Duration,
    /// TCP connect deadline
    #[serde(default = "default_connect_timeout", deserialize_with = "duration_str::deserialize_duration")]
    pub connect_timeout: Duration,
    /// Keep-alive probe interval for pooled connections
    #[serde(default = "default_tcp_keepalive", deserialize_with = "duration_str::deserialize_duration")]
    pub tcp_keepalive: Duration,
    /// Idle connections kept per host; must cover the queue's concurrency
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            app_url: None,
            app_name: default_app_name(),
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            tcp_keepalive: default_tcp_keepalive(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

#[allow(clippy::expect_used)]
fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("valid default URL")
}

fn default_app_name() -> String {
    "Switchboard".to_owned()
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_tcp_keepalive() -> Duration {
    Duration::from_secs(30)
}

const fn default_pool_max_idle() -> usize {
    50
}
