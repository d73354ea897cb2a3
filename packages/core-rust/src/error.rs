//! Error types for the enqueue path and for routing configuration.

/// A job request the transport cannot accept as specified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unable to queue a job with a delay of {requested}s (maximum is {max}s)")]
    DelayTooLong { requested: u64, max: u64 },
}

/// A setup mistake in queue routing. Never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("no destination configured for queue `{queue_name}`")]
    UnknownQueue { queue_name: String },
    #[error("no job class registered for foreign messages from queue `{queue}`")]
    UnmappedQueue { queue: String },
}

/// Errors surfaced to callers of the enqueue operations.
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("failed to encode job body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}
