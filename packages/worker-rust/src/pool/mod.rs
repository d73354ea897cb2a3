//! Bounded worker pool: runs classified jobs, deletes messages on success,
//! and applies the failure policy.
//!
//! Submission blocks the caller while the pool is saturated, which throttles
//! upstream message retrieval. A message is deleted only after its job
//! succeeds; every other path leaves it for redelivery.

mod backpressure;
pub mod config;
pub mod lifecycle;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::classify::{JobRunner, MessageClassifier};
use crate::error::{ExecutionError, PoolError};
use crate::hooks::HookRegistry;
use crate::traits::{InboundMessage, JobExecutor};

use self::backpressure::SubmissionGate;
pub use self::config::{ErrorHandler, PoolConfig};
use self::lifecycle::{InFlight, StateCell};
pub use self::lifecycle::{PoolState, ShutdownOutcome};

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Fixed-size pool of job workers with a bounded waiting queue.
///
/// Cheap to clone; clones share the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    classifier: MessageClassifier,
    executor: Arc<dyn JobExecutor>,
    hooks: Arc<HookRegistry>,
    state: StateCell,
    /// Serializes the accepting check with task spawning so no job is
    /// spawned after the drain has started.
    admission: Mutex<()>,
    gate: SubmissionGate,
    in_flight: InFlight,
    /// Set when a shutdown drain times out. Jobs still running are abandoned
    /// and leave their messages for redelivery.
    drain_expired: AtomicBool,
    shutdown: OnceCell<ShutdownOutcome>,
    fatal: OnceLock<Arc<ExecutionError>>,
}

impl WorkerPool {
    /// Creates a pool that runs the process-wide stop hooks on shutdown.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn new(
        config: PoolConfig,
        classifier: MessageClassifier,
        executor: Arc<dyn JobExecutor>,
    ) -> Result<Self, PoolError> {
        Self::with_hooks(config, classifier, executor, HookRegistry::global())
    }

    /// Creates a pool with its own hook registry.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if the configuration is invalid.
    pub fn with_hooks(
        config: PoolConfig,
        classifier: MessageClassifier,
        executor: Arc<dyn JobExecutor>,
        hooks: Arc<HookRegistry>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let gate = SubmissionGate::new(config.max_threads, config.capacity());
        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                classifier,
                executor,
                hooks,
                state: StateCell::new(PoolState::Running),
                admission: Mutex::new(()),
                gate,
                in_flight: InFlight::default(),
                drain_expired: AtomicBool::new(false),
                shutdown: OnceCell::new(),
                fatal: OnceLock::new(),
            }),
        })
    }

    /// Classify a message and submit its job.
    ///
    /// Waits while the pool is saturated. Returns once the job is accepted,
    /// not when it finishes.
    ///
    /// # Errors
    ///
    /// - `PoolError::Classify` if the message cannot be classified; nothing runs
    ///   and the message is left undeleted
    /// - `PoolError::ShutDown` if the pool no longer accepts work
    /// - `PoolError::Fatal` if the pool stopped after an unhandled job failure
    pub async fn execute(&self, message: Arc<dyn InboundMessage>) -> Result<(), PoolError> {
        let runner = self.inner.classifier.classify(message.as_ref()).map_err(|err| {
            warn!(message_id = %message.id(), queue = %message.source_queue(), error = %err,
                "message classification failed");
            err
        })?;

        if !self.inner.state.get().is_accepting() {
            return Err(self.rejection());
        }

        let Some(slot) = self.inner.gate.acquire_slot().await else {
            return Err(self.rejection());
        };

        {
            let _admission = self.inner.admission.lock();
            if !self.inner.state.get().is_accepting() {
                return Err(self.rejection());
            }
            let guard = self.inner.in_flight.guard();
            let pool = self.clone();
            tokio::spawn(async move {
                let _guard = guard;
                if let Some(_worker) = pool.inner.gate.acquire_worker().await {
                    pool.run_job(&runner, message.as_ref()).await;
                }
                drop(slot);
                pool.record_outstanding();
            });
        }

        debug!(outstanding = self.outstanding(), "job accepted");
        self.record_outstanding();
        Ok(())
    }

    /// Stop accepting work, wait for in-flight jobs, run stop hooks.
    ///
    /// `timeout` overrides `PoolConfig::shutdown_timeout`; with neither set the
    /// drain waits indefinitely. Concurrent and repeated calls share the first
    /// call's drain, so hooks run exactly once.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::Fatal` if the pool stopped, or is stopping, because
    /// a job failed with no error handler configured.
    pub async fn shutdown(&self, timeout: Option<Duration>) -> Result<ShutdownOutcome, PoolError> {
        let timeout = timeout.or(self.inner.config.shutdown_timeout);
        let outcome = *self
            .inner
            .shutdown
            .get_or_init(|| self.drain(timeout))
            .await;

        if let Some(fatal) = self.inner.fatal.get() {
            return Err(PoolError::Fatal(Arc::clone(fatal)));
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        self.inner.state.get()
    }

    /// Accepted jobs that have not finished (running plus waiting).
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.inner.gate.outstanding()
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    async fn run_job(&self, runner: &JobRunner, message: &dyn InboundMessage) {
        info!(
            job_id = %runner.id(),
            job_class = %runner.class_name(),
            message_id = %message.id(),
            retrying = runner.has_retry_attempts_remaining(),
            "job started"
        );

        match runner.run(self.inner.executor.as_ref()).await {
            Ok(()) => {
                metrics::counter!("drover_jobs_succeeded_total").increment(1);
                info!(job_id = %runner.id(), job_class = %runner.class_name(), "job finished");
                if self.inner.drain_expired.load(Ordering::SeqCst) {
                    warn!(
                        job_id = %runner.id(),
                        message_id = %message.id(),
                        "job finished after shutdown timed out, leaving message for redelivery"
                    );
                    return;
                }
                match message.delete().await {
                    Ok(()) => metrics::counter!("drover_messages_deleted_total").increment(1),
                    Err(err) => warn!(
                        job_id = %runner.id(),
                        message_id = %message.id(),
                        error = %err,
                        "failed to delete message after successful job"
                    ),
                }
            }
            Err(source) => {
                metrics::counter!("drover_jobs_failed_total").increment(1);
                let failure = ExecutionError {
                    job_id: runner.id().to_string(),
                    job_class: runner.class_name().to_string(),
                    source,
                };
                self.handle_failure(failure, message);
            }
        }
    }

    fn handle_failure(&self, failure: ExecutionError, message: &dyn InboundMessage) {
        if let Some(handler) = &self.inner.config.error_handler {
            warn!(job_id = %failure.job_id, job_class = %failure.job_class,
                error = %failure.source, "job failed, passing to error handler");
            handler(&failure, message);
            return;
        }

        error!(job_id = %failure.job_id, job_class = %failure.job_class,
            error = %failure.source, "job failed with no error handler, shutting down worker pool");
        // Only the first unhandled failure is reported.
        let _ = self.inner.fatal.set(Arc::new(failure));
        let pool = self.clone();
        tokio::spawn(async move {
            let _ = pool.shutdown(None).await;
        });
    }

    async fn drain(&self, timeout: Option<Duration>) -> ShutdownOutcome {
        {
            let _admission = self.inner.admission.lock();
            self.inner.state.set(PoolState::ShuttingDown);
        }
        info!(outstanding = self.outstanding(), ?timeout, "worker pool shutting down");

        self.inner.gate.close();

        let outcome = if self.inner.in_flight.wait_for_drain(timeout).await {
            ShutdownOutcome::Drained
        } else {
            self.inner.drain_expired.store(true, Ordering::SeqCst);
            let abandoned = self.inner.in_flight.count();
            warn!(abandoned, ?timeout, "shutdown timed out with jobs still running");
            ShutdownOutcome::TimedOut { abandoned }
        };

        self.inner.hooks.run_stop_hooks();
        self.inner.state.set(PoolState::Terminated);
        info!(?outcome, "worker pool terminated");
        outcome
    }

    fn rejection(&self) -> PoolError {
        match self.inner.fatal.get() {
            Some(fatal) => PoolError::Fatal(Arc::clone(fatal)),
            None => PoolError::ShutDown,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_outstanding(&self) {
        metrics::gauge!("drover_pool_outstanding_tasks").set(self.outstanding() as f64);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .field("outstanding", &self.outstanding())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
