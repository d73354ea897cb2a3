//! Submission gate: bounds the number of accepted jobs and running workers.
//!
//! A job holds a slot from acceptance until it finishes, and a worker permit
//! while it runs. When every slot is taken the submitter waits instead of
//! the job being rejected.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug)]
pub(crate) struct SubmissionGate {
    slots: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    capacity: usize,
}

impl SubmissionGate {
    pub(crate) fn new(max_threads: usize, capacity: usize) -> Self {
        let capacity = capacity.min(Semaphore::MAX_PERMITS);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            workers: Arc::new(Semaphore::new(max_threads.min(capacity))),
            capacity,
        }
    }

    /// Take a slot, waiting while the pool is saturated.
    ///
    /// Returns `None` once the gate is closed.
    pub(crate) async fn acquire_slot(&self) -> Option<OwnedSemaphorePermit> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => return Some(permit),
            Err(tokio::sync::TryAcquireError::Closed) => return None,
            Err(tokio::sync::TryAcquireError::NoPermits) => {}
        }

        debug!(capacity = self.capacity, "worker pool saturated, waiting for a slot");
        metrics::counter!("drover_backpressure_waits_total").increment(1);
        Arc::clone(&self.slots).acquire_owned().await.ok()
    }

    /// Wait for a free worker. Never closed, so accepted jobs always run.
    pub(crate) async fn acquire_worker(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.workers).acquire_owned().await.ok()
    }

    /// Reject every pending and future slot request.
    pub(crate) fn close(&self) {
        self.slots.close();
    }

    /// Accepted jobs that have not finished yet.
    pub(crate) fn outstanding(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn slots_are_bounded_by_capacity() {
        let gate = SubmissionGate::new(1, 2);
        let first = gate.acquire_slot().await.unwrap();
        let _second = gate.acquire_slot().await.unwrap();
        assert_eq!(gate.outstanding(), 2);

        let blocked = tokio::time::timeout(Duration::from_millis(50), gate.acquire_slot()).await;
        assert!(blocked.is_err());

        drop(first);
        assert_eq!(gate.outstanding(), 1);
        assert!(gate.acquire_slot().await.is_some());
    }

    #[tokio::test]
    async fn close_wakes_waiters_with_none() {
        let gate = Arc::new(SubmissionGate::new(1, 1));
        let _held = gate.acquire_slot().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.acquire_slot().await.is_none() })
        };
        tokio::task::yield_now().await;
        gate.close();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn workers_are_bounded_by_max_threads() {
        let gate = SubmissionGate::new(2, 5);
        let _a = gate.acquire_worker().await.unwrap();
        let _b = gate.acquire_worker().await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), gate.acquire_worker()).await;
        assert!(blocked.is_err());
    }
}
