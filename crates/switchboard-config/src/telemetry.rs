pub mod exporters;

use indexmap::IndexMap;
use serde::Deserialize;

use self::exporters::ExporterConfig;

/// Logging and OpenTelemetry configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name reported with traces and metrics
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// `EnvFilter` directive for log output
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Log line format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Extra resource attributes
    #[serde(default)]
    pub resource_attributes: IndexMap<String, String>,
    /// OTLP exporter shared by traces and metrics
    #[serde(default)]
    pub exporter: Option<ExporterConfig>,
    /// Trace sampling
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            log_format: LogFormat::default(),
            resource_attributes: IndexMap::new(),
            exporter: None,
            tracing: TracingConfig::default(),
        }
    }
}

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Trace sampling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Sampling rate (0.0 to 1.0)
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Respect the parent span's sampling decision
    #[serde(default = "default_true")]
    pub parent_based: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            sampling_rate: default_sampling_rate(),
            parent_based: true,
        }
    }
}

fn default_service_name() -> String {
    "switchboard".to_owned()
}

fn default_log_filter() -> String {
    "info".to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_sampling_rate() -> f64 {
    1.0
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}
