use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use drover_core::JobDescriptor;

use crate::error::UnknownJobClass;
use crate::traits::{JobExecutor, JobHandler};

// ---------------------------------------------------------------------------
// JobRegistry
// ---------------------------------------------------------------------------

/// Lookup table from job class name to handler.
///
/// Implements [`JobExecutor`] by dispatching each descriptor to the handler
/// registered for its `job_class`. An unknown class is an ordinary job
/// failure and goes through the pool's failure policy.
#[derive(Default)]
pub struct JobRegistry {
    handlers: DashMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its `job_class()`. Replaces any previous
    /// handler for the same class.
    pub fn register<H: JobHandler + 'static>(&self, handler: H) {
        let job_class = handler.job_class().to_string();
        self.handlers.insert(job_class, Arc::new(handler));
    }

    /// Retrieve the handler for a job class.
    pub fn get(&self, job_class: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(job_class).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl JobExecutor for JobRegistry {
    async fn execute(&self, job: JobDescriptor) -> anyhow::Result<()> {
        let handler = self.get(&job.job_class).ok_or_else(|| UnknownJobClass {
            job_class: job.job_class.clone(),
        })?;
        handler.perform(&job).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
