use std::fmt;

use serde::Deserialize;

/// Backend selection configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    /// Strategy used for every category, fixed for the process lifetime
    #[serde(default)]
    pub strategy: SelectionStrategy,
}

/// How a backend is picked among the healthy candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Always the most preferred healthy backend
    Priority,
    /// Rotate through the healthy backends per category
    RoundRobin,
    /// Weighted random draw by success rate, latency and priority
    #[default]
    HealthAwareRoundRobin,
}

impl SelectionStrategy {
    /// Name as written in configuration
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::RoundRobin => "round-robin",
            Self::HealthAwareRoundRobin => "health-aware-round-robin",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
