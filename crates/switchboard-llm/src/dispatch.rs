//! Request orchestration
//!
//! A dispatch validates its input, then submits one task to the admission
//! queue. The task classifies the latest message, and tries up to
//! `max_retries + 1` backends in turn. Each attempt selects afresh, so a
//! backend whose circuit opened on the previous attempt is skipped.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use switchboard_config::Config;
use switchboard_queue::{AdmissionQueue, QueueStats};
use switchboard_routing::{
    BackendDescriptor, BackendPool, BackendSelector, Clock, HealthRegistry, HealthSnapshot, IntentCategory,
    SystemClock, classify,
};
use switchboard_telemetry::{KeyValue, RouterMetrics, metrics::record_duration};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::LlmError;
use crate::relay::RelayStream;
use crate::types::{Completion, CompletionRequest, DispatchInput, DispatchResponse, Message};
use crate::upstream::{ByteStream, OpenAiUpstream, Upstream};

/// Entry point for routed completions
///
/// Cloning is cheap; clones share health statistics, queue and upstream.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    health: Arc<HealthRegistry>,
    selector: BackendSelector,
    queue: AdmissionQueue,
    upstream: Arc<dyn Upstream>,
    max_retries: u32,
    retry_backoff: Duration,
    metrics: RouterMetrics,
}

/// Outcome of a successful attempt
struct Attempted<T> {
    value: T,
    backend: BackendDescriptor,
    category: IntentCategory,
    attempt: u32,
}

/// Router state for status reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherStatus {
    pub strategy: &'static str,
    pub max_retries: u32,
    pub queue: QueueStats,
    pub backends: Vec<HealthSnapshot>,
}

impl Dispatcher {
    /// Build a dispatcher talking to the configured upstream
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        let upstream = OpenAiUpstream::new(&config.upstream)?;
        Self::new(config, Arc::new(upstream))
    }

    /// Build a dispatcher around an existing upstream client
    pub fn new(config: &Config, upstream: Arc<dyn Upstream>) -> Result<Self, LlmError> {
        Self::with_clock(config, upstream, Arc::new(SystemClock))
    }

    /// Like [`Dispatcher::new`], with the circuit breaker reading `clock`
    pub fn with_clock(config: &Config, upstream: Arc<dyn Upstream>, clock: Arc<dyn Clock>) -> Result<Self, LlmError> {
        let pool = BackendPool::from_config(&config.pools).map_err(anyhow::Error::from)?;
        let health = Arc::new(HealthRegistry::with_clock(Arc::new(pool), &config.health, clock));
        let selector = BackendSelector::new(Arc::clone(&health), config.selection.strategy);

        tracing::info!(
            strategy = %config.selection.strategy,
            max_retries = config.dispatch.max_retries,
            max_queue_size = config.queue.max_queue_size(),
            max_concurrency = config.queue.max_concurrency(),
            "dispatcher ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                health,
                selector,
                queue: AdmissionQueue::new(&config.queue),
                upstream,
                max_retries: config.dispatch.max_retries,
                retry_backoff: config.dispatch.retry_backoff,
                metrics: RouterMetrics::new(),
            }),
        })
    }

    /// Route a conversation and wait for the full answer
    pub async fn dispatch(&self, input: DispatchInput) -> Result<DispatchResponse, LlmError> {
        let messages = input.into_messages()?;
        let span = dispatch_span(false);

        let inner = Arc::clone(&self.inner);
        let result = self
            .inner
            .queue
            .enqueue(move || async move { inner.complete(messages).await }.instrument(span))
            .await;

        let done = self.inner.admitted(result)?;

        Ok(DispatchResponse {
            success: true,
            backend_id: done.backend.id,
            category: done.category,
            attempt: done.attempt,
            content: done.value.content,
            usage: done.value.usage,
        })
    }

    /// Route a conversation and relay the answer as it is generated
    ///
    /// The queue slot is held only until the upstream stream opens. The
    /// returned relay stops early once `cancel` fires.
    pub async fn dispatch_streaming(
        &self,
        input: DispatchInput,
        cancel: CancellationToken,
    ) -> Result<RelayStream, LlmError> {
        let messages = input.into_messages()?;
        let span = dispatch_span(true);

        let inner = Arc::clone(&self.inner);
        let result = self
            .inner
            .queue
            .enqueue(move || async move { inner.open_stream(messages).await }.instrument(span))
            .await;

        let opened = self.inner.admitted(result)?;

        Ok(RelayStream::with_metrics(
            opened.backend.id,
            opened.category,
            opened.attempt,
            opened.value,
            cancel,
            self.inner.metrics.clone(),
        ))
    }

    /// Health of every configured backend, sorted by id
    pub fn health_snapshot(&self) -> Vec<HealthSnapshot> {
        self.inner.health.snapshot()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.inner.queue.stats()
    }

    /// Strategy, retry and queue settings plus live statistics
    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            strategy: self.inner.selector.strategy().as_str(),
            max_retries: self.inner.max_retries,
            queue: self.queue_stats(),
            backends: self.health_snapshot(),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("strategy", &self.inner.selector.strategy())
            .field("max_retries", &self.inner.max_retries)
            .field("queue", &self.inner.queue)
            .finish_non_exhaustive()
    }
}

fn dispatch_span(streaming: bool) -> tracing::Span {
    tracing::info_span!(
        "dispatch",
        request_id = %Uuid::new_v4(),
        streaming,
        category = tracing::field::Empty,
    )
}

fn category_of(messages: &[Message]) -> IntentCategory {
    let latest = messages.last().map_or("", |message| message.content.as_str());
    let category = classify(latest);

    tracing::Span::current().record("category", category.as_str());
    tracing::debug!(%category, "request classified");

    category
}

impl Inner {
    async fn complete(&self, messages: Vec<Message>) -> Result<Attempted<Completion>, LlmError> {
        let category = category_of(&messages);
        let upstream = &self.upstream;

        self.with_retries(category, |backend| {
            let request = CompletionRequest::for_backend(backend, &messages);
            async move { upstream.complete(&request).await }
        })
        .await
    }

    async fn open_stream(&self, messages: Vec<Message>) -> Result<Attempted<ByteStream>, LlmError> {
        let category = category_of(&messages);
        let upstream = &self.upstream;

        // success is recorded once headers arrive; the body is not retried
        self.with_retries(category, |backend| {
            let request = CompletionRequest::for_backend(backend, &messages);
            async move { upstream.complete_stream(&request).await }
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, category: IntentCategory, mut call: F) -> Result<Attempted<T>, LlmError>
    where
        F: FnMut(&BackendDescriptor) -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;

        loop {
            let backend = self.selector.select(category);
            let started = Instant::now();
            let result = call(&backend).await;
            let elapsed = started.elapsed();

            record_duration(
                &self.metrics.upstream_duration,
                started,
                &[
                    KeyValue::new("backend", backend.id.clone()),
                    KeyValue::new("success", result.is_ok()),
                ],
            );

            let error = match result {
                Ok(value) => {
                    self.health.record_success(&backend.id, elapsed);
                    self.count(category, "success");
                    tracing::info!(
                        backend = %backend.id,
                        attempt,
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "request completed"
                    );

                    return Ok(Attempted {
                        value,
                        backend,
                        category,
                        attempt,
                    });
                }
                Err(error) => error,
            };

            self.health.record_failure(&backend.id, &error);
            tracing::warn!(backend = %backend.id, attempt, %error, "attempt failed");

            if attempt >= self.max_retries {
                self.count(category, "exhausted");
                return Err(LlmError::AllRetriesExhausted {
                    category,
                    attempts: attempt + 1,
                    source: Box::new(error),
                });
            }

            attempt += 1;
            tokio::time::sleep(self.retry_backoff * attempt).await;
        }
    }

    fn count(&self, category: IntentCategory, outcome: &'static str) {
        self.metrics.dispatches.add(
            1,
            &[
                KeyValue::new("category", category.as_str()),
                KeyValue::new("outcome", outcome),
            ],
        );
    }

    /// Pass a queued result through, counting rejections
    fn admitted<T>(&self, result: Result<T, LlmError>) -> Result<T, LlmError> {
        if let Err(LlmError::Overloaded { .. }) = &result {
            self.metrics.queue_rejections.add(1, &[]);
        }
        result
    }
}
