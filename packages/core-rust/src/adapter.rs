//! Enqueue adapter: the producer-facing entry point.
//!
//! Wraps a [`Transport`] with the routing table and a clock. Every operation
//! builds and validates all entries before the first send, so validation and
//! configuration errors never leave a partial enqueue behind.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::batch::BatchPlanner;
use crate::clock::{ClockSource, SystemClock};
use crate::config::RoutingConfig;
use crate::entry::{delay_seconds, EntryBuilder};
use crate::error::EnqueueError;
use crate::job::Job;
use crate::traits::Transport;

/// Producer-side adapter that sends jobs through a transport.
pub struct QueueAdapter<T> {
    routing: Arc<RoutingConfig>,
    transport: T,
    clock: Arc<dyn ClockSource>,
}

impl<T: Transport> QueueAdapter<T> {
    /// Creates an adapter reading time from the system clock.
    #[must_use]
    pub fn new(routing: Arc<RoutingConfig>, transport: T) -> Self {
        Self {
            routing,
            transport,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for delay computation.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn routing(&self) -> &RoutingConfig {
        &self.routing
    }

    /// Sends `job` for immediate delivery.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown queue, or the transport's error.
    pub async fn enqueue(&self, job: &Job) -> Result<(), EnqueueError> {
        self.send_one(job, None).await
    }

    /// Sends `job` for delivery at `timestamp_ms` (milliseconds since Unix epoch).
    ///
    /// # Errors
    ///
    /// Returns `EnqueueError::Validation` if the timestamp is more than
    /// 15 minutes away; nothing is sent in that case.
    pub async fn enqueue_at(&self, job: &Job, timestamp_ms: u64) -> Result<(), EnqueueError> {
        let delay = delay_seconds(timestamp_ms, self.clock.now())?;
        self.send_one(job, Some(delay)).await
    }

    /// Sends `jobs` in batches and returns how many entries the transport accepted.
    ///
    /// A batch the transport only partially accepts is reported through the
    /// count; rejected entries are not retried.
    ///
    /// # Errors
    ///
    /// Planning errors are returned before any batch is sent. A transport
    /// error aborts the remaining batches; batches already sent stay sent.
    pub async fn enqueue_all(&self, jobs: &[Job]) -> Result<usize, EnqueueError> {
        let batches = BatchPlanner::new(&self.routing).plan(jobs, self.clock.now())?;

        let mut enqueued = 0;
        for batch in batches {
            let requested = batch.entries.len();
            let accepted = self
                .transport
                .send_batch(&batch.destination, batch.entries)
                .await?;
            if accepted < requested {
                warn!(
                    queue = %batch.queue_name,
                    requested,
                    accepted,
                    "transport rejected part of a batch"
                );
            } else {
                debug!(queue = %batch.queue_name, accepted, "batch sent");
            }
            enqueued += accepted;
        }
        Ok(enqueued)
    }

    async fn send_one(&self, job: &Job, delay: Option<u32>) -> Result<(), EnqueueError> {
        let builder = EntryBuilder::new(&self.routing);
        let destination = builder.destination_for(&job.queue_name)?;
        let mut entry = builder.build(job)?;
        entry.delay_seconds = delay;

        debug!(
            job_id = %job.job_id,
            job_class = %job.job_class,
            queue = %job.queue_name,
            ordered = entry.is_ordered(),
            "sending entry"
        );
        self.transport.send(destination, entry).await?;
        Ok(())
    }
}
