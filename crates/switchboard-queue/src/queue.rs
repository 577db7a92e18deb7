use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::Serialize;
use switchboard_config::QueueConfig;
use tokio::sync::oneshot;

use crate::error::QueueError;

/// Queue counters for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Admitted tasks waiting for a slot
    pub pending: usize,
    /// Tasks currently running
    pub in_flight: usize,
    /// Enqueue attempts rejected since startup
    pub rejected: u64,
    pub max_queue_size: usize,
    pub max_concurrency: usize,
}

/// Runs at most `max_concurrency` tasks at once, in FIFO admission order
///
/// Cloning is cheap and every clone shares the same queue.
#[derive(Clone)]
pub struct AdmissionQueue {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    max_queue_size: usize,
    max_concurrency: usize,
    retry_after: Duration,
    rejected: AtomicU64,
}

#[derive(Default)]
struct State {
    pending: VecDeque<BoxFuture<'static, ()>>,
    in_flight: usize,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        // the lock is never held across a panic point
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdmissionQueue {
    /// Create a queue sized from configuration
    pub fn new(config: &QueueConfig) -> Self {
        Self::with_limits(config.max_queue_size(), config.max_concurrency(), config.retry_after)
    }

    /// Create a queue with explicit limits
    pub fn with_limits(max_queue_size: usize, max_concurrency: usize, retry_after: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                max_queue_size,
                max_concurrency,
                retry_after,
                rejected: AtomicU64::new(0),
            }),
        }
    }

    /// Submit a task
    ///
    /// The capacity check happens here, before the returned future is
    /// polled: a full queue counts the rejection and the future resolves to
    /// [`QueueError::Overloaded`] without ever storing the task. Admitted
    /// tasks run on the tokio runtime, so dropping the returned future does
    /// not cancel them.
    pub fn enqueue<F, Fut, T, E>(&self, task: F) -> impl Future<Output = Result<T, E>> + Send + use<F, Fut, T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<QueueError> + Send + 'static,
    {
        let admission = self.admit(task);

        async move {
            match admission {
                Ok(receiver) => receiver.await.unwrap_or_else(|_| Err(QueueError::Abandoned.into())),
                Err(error) => Err(error.into()),
            }
        }
    }

    /// Current counters
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state();

        QueueStats {
            pending: state.pending.len(),
            in_flight: state.in_flight,
            rejected: self.inner.rejected.load(Ordering::Relaxed),
            max_queue_size: self.inner.max_queue_size,
            max_concurrency: self.inner.max_concurrency,
        }
    }

    fn admit<F, Fut, T, E>(&self, task: F) -> Result<oneshot::Receiver<Result<T, E>>, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();

        {
            let mut state = self.inner.state();

            if state.pending.len() >= self.inner.max_queue_size {
                drop(state);
                let rejected = self.inner.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    max_queue_size = self.inner.max_queue_size,
                    rejected,
                    "admission queue full, rejecting request"
                );
                return Err(QueueError::Overloaded {
                    retry_after: self.inner.retry_after,
                });
            }

            state.pending.push_back(Box::pin(async move {
                // the caller may have gone away
                let _ = sender.send(task().await);
            }));
        }

        advance(&self.inner);

        Ok(receiver)
    }
}

impl fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionQueue").field("stats", &self.stats()).finish()
    }
}

/// Start pending tasks while slots are free
fn advance(inner: &Arc<Inner>) {
    loop {
        let job = {
            let mut state = inner.state();
            if state.in_flight >= inner.max_concurrency {
                return;
            }
            let Some(job) = state.pending.pop_front() else {
                return;
            };
            state.in_flight += 1;
            job
        };

        let slot = Slot {
            inner: Arc::clone(inner),
        };

        tokio::spawn(async move {
            let _slot = slot;
            job.await;
        });
    }
}

/// Held by a running task; frees its slot on completion or panic
struct Slot {
    inner: Arc<Inner>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.inner.state().in_flight -= 1;
        advance(&self.inner);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use futures_util::future::join_all;
    use tokio::sync::watch;
    use tokio::time::Instant;

    use super::*;

    const RETRY_AFTER: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn rejects_exactly_the_excess() {
        let queue = AdmissionQueue::with_limits(2, 1, RETRY_AFTER);
        let (open, gate) = watch::channel(false);

        let results: Vec<_> = (0..5)
            .map(|i| {
                let mut gate = gate.clone();
                queue.enqueue(move || async move {
                    let _ = gate.wait_for(|open| *open).await;
                    Ok::<_, QueueError>(i)
                })
            })
            .collect();

        // one running, two waiting, two turned away
        let stats = queue.stats();
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.rejected, 2);

        open.send_replace(true);
        let results = join_all(results).await;

        assert_eq!(results[..3], [Ok(0), Ok(1), Ok(2)]);
        for result in &results[3..] {
            assert_eq!(
                *result,
                Err(QueueError::Overloaded {
                    retry_after: RETRY_AFTER
                })
            );
        }
        assert_eq!(queue.stats().rejected, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_max_concurrency() {
        let queue = AdmissionQueue::with_limits(100, 3, RETRY_AFTER);
        let spans = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let spans = Arc::clone(&spans);
                queue.enqueue(move || async move {
                    let start = Instant::now();
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    spans.lock().unwrap().push((start, Instant::now()));
                    Ok::<_, QueueError>(())
                })
            })
            .collect();

        for result in join_all(tasks).await {
            result.unwrap();
        }

        let spans = spans.lock().unwrap();
        assert_eq!(spans.len(), 20);

        // overlap at every start instant
        let peak = spans
            .iter()
            .map(|(at, _)| spans.iter().filter(|(start, end)| start <= at && at < end).count())
            .max()
            .unwrap();
        assert!(peak <= 3, "{peak} tasks overlapped");
    }

    #[tokio::test]
    async fn starts_tasks_in_fifo_order() {
        let queue = AdmissionQueue::with_limits(10, 1, RETRY_AFTER);
        let order = Arc::new(Mutex::new(Vec::new()));

        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                queue.enqueue(move || async move {
                    order.lock().unwrap().push(i);
                    tokio::task::yield_now().await;
                    Ok::<_, QueueError>(())
                })
            })
            .collect();

        join_all(tasks).await;
        assert_eq!(*order.lock().unwrap(), [0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn task_errors_are_returned_and_free_the_slot() {
        #[derive(Debug, PartialEq)]
        enum TaskError {
            Queue(QueueError),
            Failed,
        }

        impl From<QueueError> for TaskError {
            fn from(error: QueueError) -> Self {
                Self::Queue(error)
            }
        }

        let queue = AdmissionQueue::with_limits(10, 1, RETRY_AFTER);

        let failed = queue.enqueue(|| async { Err::<(), _>(TaskError::Failed) }).await;
        assert_eq!(failed, Err(TaskError::Failed));

        let ok = queue.enqueue(|| async { Ok::<_, TaskError>(7) }).await;
        assert_eq!(ok, Ok(7));
    }

    #[tokio::test]
    async fn panicking_task_releases_its_slot() {
        let queue = AdmissionQueue::with_limits(10, 1, RETRY_AFTER);

        let panicked = queue.enqueue(|| async {
            if true {
                panic!("task blew up");
            }
            Ok::<(), QueueError>(())
        });
        let next = queue.enqueue(|| async { Ok::<_, QueueError>("ran") });

        assert_eq!(panicked.await, Err(QueueError::Abandoned));
        assert_eq!(next.await, Ok("ran"));
    }

    #[tokio::test]
    async fn dropped_caller_does_not_cancel_admitted_task() {
        let queue = AdmissionQueue::with_limits(10, 1, RETRY_AFTER);
        let finished = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&finished);
        drop(queue.enqueue(move || async move {
            tokio::task::yield_now().await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, QueueError>(())
        }));

        // runs after the first task since concurrency is 1
        queue.enqueue(|| async { Ok::<_, QueueError>(()) }).await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sized_from_config() {
        let config = QueueConfig {
            memory_limit_mb: 2048,
            max_queue_size: None,
            max_concurrency: Some(4),
            retry_after: RETRY_AFTER,
        };

        let stats = AdmissionQueue::new(&config).stats();
        assert_eq!(stats.max_queue_size, 100);
        assert_eq!(stats.max_concurrency, 4);
    }
}
