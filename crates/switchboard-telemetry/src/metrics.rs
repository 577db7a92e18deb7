//! Metric names and the instruments recorded by the router

use std::time::Instant;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

pub const DISPATCH_COUNT: &str = "switchboard.dispatch.count";
pub const UPSTREAM_DURATION: &str = "switchboard.upstream.duration";
pub const QUEUE_REJECTIONS: &str = "switchboard.queue.rejections";
pub const STREAM_DURATION: &str = "switchboard.stream.duration";

/// Record the time since `start` on a histogram, in seconds
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}

/// Instruments created from the global meter
///
/// Without an installed meter provider every recording is a no-op.
#[derive(Debug, Clone)]
pub struct RouterMetrics {
    /// Finished dispatches by category and outcome
    pub dispatches: Counter<u64>,
    /// Duration of each upstream attempt
    pub upstream_duration: Histogram<f64>,
    /// Requests turned away by the admission queue
    pub queue_rejections: Counter<u64>,
    /// Lifetime of relayed streams
    pub stream_duration: Histogram<f64>,
}

impl RouterMetrics {
    pub fn new() -> Self {
        let meter = global::meter("switchboard");

        Self {
            dispatches: meter
                .u64_counter(DISPATCH_COUNT)
                .with_description("Dispatched requests")
                .build(),
            upstream_duration: meter
                .f64_histogram(UPSTREAM_DURATION)
                .with_description("Upstream attempt duration")
                .with_unit("s")
                .build(),
            queue_rejections: meter
                .u64_counter(QUEUE_REJECTIONS)
                .with_description("Requests rejected because the admission queue was full")
                .build(),
            stream_duration: meter
                .f64_histogram(STREAM_DURATION)
                .with_description("Relayed stream duration")
                .with_unit("s")
                .build(),
        }
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
