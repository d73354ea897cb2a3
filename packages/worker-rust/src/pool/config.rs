//! Worker pool configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ExecutionError, PoolError};
use crate::traits::InboundMessage;

/// Callback invoked when a job fails and the pool should keep running.
pub type ErrorHandler = Arc<dyn Fn(&ExecutionError, &dyn InboundMessage) + Send + Sync>;

/// Worker pool configuration. Fixed at construction.
///
/// With no `error_handler`, an unhandled job failure shuts the pool down.
#[derive(Clone)]
pub struct PoolConfig {
    /// Maximum number of jobs running at once.
    pub max_threads: usize,
    /// Maximum number of accepted jobs waiting for a worker.
    pub max_queue: usize,
    /// Recovers from job failures; absent means fail fast.
    pub error_handler: Option<ErrorHandler>,
    /// Default drain bound for `shutdown`; `None` waits indefinitely.
    pub shutdown_timeout: Option<Duration>,
}

impl PoolConfig {
    #[must_use]
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    #[must_use]
    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutionError, &dyn InboundMessage) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// Total number of jobs the pool holds at once (running plus waiting).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_threads.saturating_add(self.max_queue)
    }

    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `max_threads` is zero.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_threads == 0 {
            return Err(PoolError::InvalidConfig(
                "max_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_threads: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            max_queue: 1,
            error_handler: None,
            shutdown_timeout: None,
        }
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("max_threads", &self.max_threads)
            .field("max_queue", &self.max_queue)
            .field("error_handler", &self.error_handler.is_some())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PoolConfig::default();
        assert!(config.max_threads >= 1);
        assert_eq!(config.max_queue, 1);
        assert!(config.error_handler.is_none());
        assert!(config.shutdown_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_set_fields() {
        let config = PoolConfig::default()
            .with_max_threads(4)
            .with_max_queue(6)
            .with_shutdown_timeout(Duration::from_secs(5))
            .with_error_handler(|_, _| {});

        assert_eq!(config.max_threads, 4);
        assert_eq!(config.max_queue, 6);
        assert_eq!(config.capacity(), 10);
        assert_eq!(config.shutdown_timeout, Some(Duration::from_secs(5)));
        assert!(config.error_handler.is_some());
    }

    #[test]
    fn zero_threads_is_rejected() {
        let err = PoolConfig::default().with_max_threads(0).validate().unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn zero_queue_is_allowed() {
        let config = PoolConfig::default().with_max_threads(1).with_max_queue(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity(), 1);
    }

    #[test]
    fn debug_hides_handler() {
        let config = PoolConfig::default().with_error_handler(|_, _| {});
        let rendered = format!("{config:?}");
        assert!(rendered.contains("error_handler: true"));
    }
}
