//! Backend health tracking with a circuit breaker
//!
//! Every backend in the pool gets a statistics record at construction.
//! Failures accumulate until the threshold opens the backend's circuit; it
//! closes again on the next success or once the recovery time has passed
//! since it opened. Successes on a closed circuit do not reset the count.
//! Recovery is evaluated lazily whenever a record is read, so there are no
//! timers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use switchboard_config::HealthConfig;

use crate::intent::IntentCategory;
use crate::registry::{BackendDescriptor, BackendPool};

/// Source of the current instant
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(millis, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::Relaxed))
    }
}

/// Circuit breaker state of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CircuitState {
    /// Requests flow through
    Closed,
    /// Backend is skipped until it recovers
    Open,
}

/// Mutable statistics record, one per backend id
#[derive(Debug, Default)]
struct BackendStats {
    failure_count: u32,
    success_count: u64,
    total_requests: u64,
    last_failure_at: Option<Instant>,
    last_success_at: Option<Instant>,
    avg_response_time_ms: f64,
    healthy: bool,
    circuit_open: bool,
    /// When the circuit last opened; later failures do not move it
    opened_at: Option<Instant>,
}

impl BackendStats {
    fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    fn recovered(&self, now: Instant, recovery_time: Duration) -> bool {
        self.circuit_open
            && self
                .opened_at
                .is_some_and(|opened_at| now.saturating_duration_since(opened_at) >= recovery_time)
    }

    fn is_healthy(&self, now: Instant, recovery_time: Duration) -> bool {
        (self.healthy && !self.circuit_open) || self.recovered(now, recovery_time)
    }

    fn close(&mut self) {
        self.failure_count = 0;
        self.healthy = true;
        self.circuit_open = false;
        self.opened_at = None;
    }

    fn view(&self, now: Instant, recovery_time: Duration) -> BackendHealth {
        let recovered = self.recovered(now, recovery_time);
        let healthy = self.is_healthy(now, recovery_time);

        BackendHealth {
            failure_count: if recovered { 0 } else { self.failure_count },
            success_count: self.success_count,
            total_requests: self.total_requests,
            last_failure_at: self.last_failure_at,
            last_success_at: self.last_success_at,
            avg_response_time_ms: self.avg_response_time_ms,
            healthy,
            circuit: if healthy { CircuitState::Closed } else { CircuitState::Open },
        }
    }
}

/// Point-in-time view of one backend's statistics
///
/// Lazy recovery is already applied: a circuit past its recovery time reads
/// as closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendHealth {
    pub failure_count: u32,
    pub success_count: u64,
    pub total_requests: u64,
    pub last_failure_at: Option<Instant>,
    pub last_success_at: Option<Instant>,
    pub avg_response_time_ms: f64,
    pub healthy: bool,
    pub circuit: CircuitState,
}

impl BackendHealth {
    /// Successes over total requests, `None` before the first request
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_requests > 0).then(|| self.success_count as f64 / self.total_requests as f64)
    }
}

/// Observability projection of a single backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub backend_id: String,
    /// Percentage with two decimals, 0 before the first request
    pub success_rate: f64,
    /// Rounded to whole milliseconds
    pub avg_response_time_ms: u64,
    pub is_healthy: bool,
    pub circuit_breaker: CircuitState,
    pub total_requests: u64,
    pub failures: u32,
    pub successes: u64,
}

/// Per-backend health statistics and circuit breakers
#[derive(Debug)]
pub struct HealthRegistry {
    pool: Arc<BackendPool>,
    stats: DashMap<String, BackendStats>,
    failure_threshold: u32,
    recovery_time: Duration,
    clock: Arc<dyn Clock>,
}

impl HealthRegistry {
    /// Create a registry for every backend in `pool`
    pub fn new(pool: Arc<BackendPool>, config: &HealthConfig) -> Self {
        Self::with_clock(pool, config, Arc::new(SystemClock))
    }

    /// Create a registry reading time from `clock`
    pub fn with_clock(pool: Arc<BackendPool>, config: &HealthConfig, clock: Arc<dyn Clock>) -> Self {
        let stats = DashMap::new();
        for id in pool.backend_ids() {
            stats.insert(id.to_owned(), BackendStats::new());
        }

        Self {
            pool,
            stats,
            failure_threshold: config.failure_threshold,
            recovery_time: config.recovery_time,
            clock,
        }
    }

    /// The pool this registry tracks
    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Record a successful attempt that took `elapsed`
    ///
    /// Closes an open circuit immediately, clearing its failure count.
    /// Unknown ids are ignored.
    pub fn record_success(&self, id: &str, elapsed: Duration) {
        let now = self.clock.now();
        let Some(mut stats) = self.stats.get_mut(id) else {
            return;
        };

        self.normalize(id, &mut stats, now);

        stats.success_count += 1;
        stats.total_requests += 1;
        stats.last_success_at = Some(now);

        #[allow(clippy::cast_precision_loss)]
        let n = stats.total_requests as f64;
        let sample = elapsed.as_secs_f64() * 1000.0;
        stats.avg_response_time_ms = stats.avg_response_time_ms.mul_add(n - 1.0, sample) / n;

        if stats.circuit_open {
            stats.close();
            tracing::info!(backend = id, "circuit breaker closed by success");
        }
    }

    /// Record a failed attempt
    ///
    /// Opens the circuit once the failure count reaches the threshold.
    /// Unknown ids are ignored.
    pub fn record_failure(&self, id: &str, error: &dyn fmt::Display) {
        let now = self.clock.now();
        let Some(mut stats) = self.stats.get_mut(id) else {
            return;
        };

        self.normalize(id, &mut stats, now);

        stats.failure_count += 1;
        stats.total_requests += 1;
        stats.last_failure_at = Some(now);

        tracing::debug!(backend = id, failures = stats.failure_count, %error, "backend attempt failed");

        if stats.failure_count >= self.failure_threshold && !stats.circuit_open {
            stats.circuit_open = true;
            stats.healthy = false;
            stats.opened_at = Some(now);

            tracing::warn!(
                backend = id,
                failures = stats.failure_count,
                recovery_secs = self.recovery_time.as_secs(),
                "circuit breaker opened"
            );
        }
    }

    /// Whether `id` may receive traffic; unknown ids count as healthy
    pub fn is_healthy(&self, id: &str) -> bool {
        let now = self.clock.now();
        self.stats
            .get(id)
            .is_none_or(|stats| stats.is_healthy(now, self.recovery_time))
    }

    /// Current statistics of one backend
    pub fn stats(&self, id: &str) -> Option<BackendHealth> {
        let now = self.clock.now();
        self.stats.get(id).map(|stats| stats.view(now, self.recovery_time))
    }

    /// Healthy backends for `category`, most preferred first
    ///
    /// Sorted by priority, then average response time. The sort is stable so
    /// configuration order breaks remaining ties.
    pub fn healthy_backends(&self, category: IntentCategory) -> Vec<&BackendDescriptor> {
        let mut healthy: Vec<(&BackendDescriptor, f64)> = self
            .pool
            .backends(category)
            .iter()
            .filter_map(|backend| {
                let health = self.stats(&backend.id);
                match health {
                    Some(health) if !health.healthy => None,
                    Some(health) => Some((backend, health.avg_response_time_ms)),
                    None => Some((backend, 0.0)),
                }
            })
            .collect();

        healthy.sort_by(|(a, a_avg), (b, b_avg)| a.priority.cmp(&b.priority).then(a_avg.total_cmp(b_avg)));

        healthy.into_iter().map(|(backend, _)| backend).collect()
    }

    /// Projection of every backend for status reporting, ordered by id
    pub fn snapshot(&self) -> Vec<HealthSnapshot> {
        let now = self.clock.now();

        let mut snapshot: Vec<HealthSnapshot> = self
            .stats
            .iter()
            .map(|entry| {
                let health = entry.value().view(now, self.recovery_time);
                let success_rate = health
                    .success_rate()
                    .map_or(0.0, |rate| (rate * 10_000.0).round() / 100.0);

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let avg_response_time_ms = health.avg_response_time_ms.round() as u64;

                HealthSnapshot {
                    backend_id: entry.key().clone(),
                    success_rate,
                    avg_response_time_ms,
                    is_healthy: health.healthy,
                    circuit_breaker: health.circuit,
                    total_requests: health.total_requests,
                    failures: health.failure_count,
                    successes: health.success_count,
                }
            })
            .collect();

        snapshot.sort_by(|a, b| a.backend_id.cmp(&b.backend_id));
        snapshot
    }

    /// Apply an elapsed recovery to the stored record
    fn normalize(&self, id: &str, stats: &mut BackendStats, now: Instant) {
        if stats.recovered(now, self.recovery_time) {
            stats.close();
            tracing::info!(backend = id, "circuit breaker recovered");
        }
    }
}
