//! Error types for classification, execution and the worker pool.

use std::sync::Arc;

use drover_core::ConfigurationError;

/// Failure to turn an inbound message into a runnable job.
///
/// The message is left undeleted so the transport can redeliver it.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("message {message_id} has a malformed job body: {source}")]
    MalformedBody {
        message_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A job's own logic failed.
#[derive(Debug, thiserror::Error)]
#[error("job {job_id} [{job_class}] failed: {source}")]
pub struct ExecutionError {
    pub job_id: String,
    pub job_class: String,
    #[source]
    pub source: anyhow::Error,
}

/// No handler is registered for a job class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no handler registered for job class `{job_class}`")]
pub struct UnknownJobClass {
    pub job_class: String,
}

/// Errors returned by [`WorkerPool`](crate::pool::WorkerPool) operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("worker pool is shut down")]
    ShutDown,
    #[error("worker pool stopped after an unhandled job failure: {0}")]
    Fatal(Arc<ExecutionError>),
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}
