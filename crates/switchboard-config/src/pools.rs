use serde::Deserialize;

/// Backend lists per intent category
///
/// Each list is ordered; the order breaks ties between backends with
/// equal priority and latency. Categories left out of the configuration
/// keep their built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolsConfig {
    #[serde(default = "default_coding")]
    pub coding: Vec<BackendConfig>,
    #[serde(default = "default_math")]
    pub math: Vec<BackendConfig>,
    #[serde(default = "default_creative")]
    pub creative: Vec<BackendConfig>,
    #[serde(default = "default_reasoning")]
    pub reasoning: Vec<BackendConfig>,
    /// Also the last-resort fallback pool; must not be empty
    #[serde(default = "default_general")]
    pub general: Vec<BackendConfig>,
}

impl PoolsConfig {
    /// Every configured list, paired with its category name
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[BackendConfig])> {
        [
            ("coding", self.coding.as_slice()),
            ("math", self.math.as_slice()),
            ("creative", self.creative.as_slice()),
            ("reasoning", self.reasoning.as_slice()),
            ("general", self.general.as_slice()),
        ]
        .into_iter()
    }
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            coding: default_coding(),
            math: default_math(),
            creative: default_creative(),
            reasoning: default_reasoning(),
            general: default_general(),
        }
    }
}

/// A single upstream model entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Model identifier sent upstream
    pub id: String,
    /// 1 is the most preferred
    pub priority: u32,
    /// Completion token cap sent as `max_tokens`
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f64,
}

impl BackendConfig {
    fn new(id: &str, priority: u32, max_tokens: u32, temperature: f64) -> Self {
        Self {
            id: id.to_owned(),
            priority,
            max_tokens,
            temperature,
        }
    }
}

const QWEN_CODER: &str = "qwen/qwen-2.5-coder-32b-instruct:free";
const DEEPSEEK_CHAT: &str = "deepseek/deepseek-chat-v3.1:free";
const DEEPSEEK_R1: &str = "deepseek/deepseek-r1-0528:free";
const GLM_AIR: &str = "z-ai/glm-4.5-air:free";
const MINIMAX: &str = "minimax/minimax-m2:free";

fn default_coding() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(QWEN_CODER, 1, 4096, 0.3),
        BackendConfig::new(DEEPSEEK_CHAT, 2, 8192, 0.4),
    ]
}

fn default_math() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(DEEPSEEK_R1, 1, 8192, 0.2),
        BackendConfig::new(QWEN_CODER, 2, 4096, 0.3),
    ]
}

fn default_creative() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(MINIMAX, 1, 8192, 0.9),
        BackendConfig::new(GLM_AIR, 2, 4096, 0.8),
    ]
}

fn default_reasoning() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(DEEPSEEK_R1, 1, 8192, 0.7),
        BackendConfig::new(GLM_AIR, 2, 4096, 0.7),
    ]
}

fn default_general() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(GLM_AIR, 1, 4096, 0.7),
        BackendConfig::new(DEEPSEEK_R1, 2, 8192, 0.7),
        BackendConfig::new(MINIMAX, 3, 8192, 0.7),
    ]
}
