use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// OTLP exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    /// Collector endpoint
    pub endpoint: Url,
    /// Wire protocol
    #[serde(default)]
    pub protocol: ExportProtocol,
    /// How often metrics are pushed
    #[serde(default = "default_metrics_interval", deserialize_with = "duration_str::deserialize_duration")]
    pub metrics_interval: Duration,
}

/// OTLP export protocol
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportProtocol {
    /// gRPC (default)
    #[default]
    Grpc,
    /// HTTP/protobuf
    HttpProto,
}

const fn default_metrics_interval() -> Duration {
    Duration::from_secs(30)
}
