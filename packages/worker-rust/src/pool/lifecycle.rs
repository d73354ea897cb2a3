//! Pool state machine, in-flight job tracking and shutdown outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

/// Worker pool state.
///
/// State machine: Idle -> Running -> ShuttingDown -> Terminated
///
/// A constructed [`WorkerPool`](super::WorkerPool) starts in `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Not yet constructed. Never observed through a built pool.
    Idle,
    /// Accepting and running jobs.
    Running,
    /// Shutdown started; new submissions are rejected.
    ShuttingDown,
    /// Drain finished and stop hooks have run.
    Terminated,
}

impl PoolState {
    /// Whether the pool still takes submissions.
    #[must_use]
    pub fn is_accepting(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// How the drain step of a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight job finished.
    Drained,
    /// The timeout elapsed first; `abandoned` jobs were still running.
    TimedOut { abandoned: usize },
}

/// Lock-free holder for the current [`PoolState`].
#[derive(Debug)]
pub(crate) struct StateCell {
    state: ArcSwap<PoolState>,
}

impl StateCell {
    pub(crate) fn new(initial: PoolState) -> Self {
        Self {
            state: ArcSwap::from_pointee(initial),
        }
    }

    pub(crate) fn get(&self) -> PoolState {
        **self.state.load()
    }

    pub(crate) fn set(&self, state: PoolState) {
        self.state.store(Arc::new(state));
    }
}

/// Counts spawned jobs that have not finished.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    /// Creates a guard that keeps the job counted until dropped, even if the
    /// job panics.
    pub(crate) fn guard(&self) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Waits until no job is in flight, up to `timeout` when given.
    ///
    /// Returns `false` if the timeout expired first.
    pub(crate) async fn wait_for_drain(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|limit| tokio::time::Instant::now() + limit);

        loop {
            if self.count() == 0 {
                return true;
            }

            if deadline.is_some_and(|deadline| tokio::time::Instant::now() >= deadline) {
                return false;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Decrements the in-flight count when dropped.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
