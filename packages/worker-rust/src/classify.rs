//! Message classification: converts an inbound message into a runnable job.

use std::collections::HashMap;

use drover_core::{ConfigurationError, JobDescriptor, RoutingConfig, JOB_CLASS_ATTRIBUTE};
use serde_json::{json, Value};

use crate::error::ClassifyError;
use crate::traits::{InboundMessage, JobExecutor};

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

/// How a message entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    /// Produced by this system's entry builder.
    Native,
    /// Produced by an unrelated producer sharing the queue.
    Foreign,
}

/// A classified message, ready to hand to the job framework.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRunner {
    descriptor: JobDescriptor,
    origin: JobOrigin,
}

impl JobRunner {
    /// Job id of the descriptor.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.job_id
    }

    /// Job class of the descriptor.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.descriptor.job_class
    }

    #[must_use]
    pub fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn origin(&self) -> JobOrigin {
        self.origin
    }

    /// Whether the descriptor carries prior-failure state. Informational only.
    #[must_use]
    pub fn has_retry_attempts_remaining(&self) -> bool {
        self.descriptor.has_retry_attempts_remaining()
    }

    /// Hand the descriptor to the executor and return whatever it returns.
    ///
    /// # Errors
    ///
    /// Propagates the executor's error unchanged.
    pub async fn run(&self, executor: &dyn JobExecutor) -> anyhow::Result<()> {
        executor.execute(self.descriptor.clone()).await
    }
}

// ---------------------------------------------------------------------------
// MessageClassifier
// ---------------------------------------------------------------------------

/// Decides whether a message is native or foreign and builds its descriptor.
///
/// Foreign handler classes are resolved once from routing configuration and
/// never reloaded.
#[derive(Debug, Clone, Default)]
pub struct MessageClassifier {
    /// Source queue identifier -> handler job class.
    foreign_handlers: HashMap<String, String>,
}

impl MessageClassifier {
    /// Build the foreign-handler table from every queue that declares a `job_class`.
    #[must_use]
    pub fn new(routing: &RoutingConfig) -> Self {
        Self::from_handlers(routing.foreign_handlers())
    }

    #[must_use]
    pub fn from_handlers(foreign_handlers: HashMap<String, String>) -> Self {
        Self { foreign_handlers }
    }

    /// A message is native iff it carries the job-class attribute.
    #[must_use]
    pub fn is_native(message: &dyn InboundMessage) -> bool {
        message.attributes().contains_key(JOB_CLASS_ATTRIBUTE)
    }

    /// Classify a message into a [`JobRunner`].
    ///
    /// # Errors
    ///
    /// - `ClassifyError::MalformedBody` if a native body is not a job descriptor
    /// - `ClassifyError::Configuration` if a foreign message comes from a queue
    ///   with no registered handler class
    pub fn classify(&self, message: &dyn InboundMessage) -> Result<JobRunner, ClassifyError> {
        if Self::is_native(message) {
            let descriptor: JobDescriptor =
                serde_json::from_str(message.body()).map_err(|source| {
                    ClassifyError::MalformedBody {
                        message_id: message.id().to_string(),
                        source,
                    }
                })?;
            return Ok(JobRunner {
                descriptor,
                origin: JobOrigin::Native,
            });
        }

        let queue = message.source_queue();
        let job_class =
            self.foreign_handlers
                .get(queue)
                .ok_or_else(|| ConfigurationError::UnmappedQueue {
                    queue: queue.to_string(),
                })?;

        let descriptor = JobDescriptor::new(
            job_class.clone(),
            message.id(),
            vec![foreign_payload(message)],
        );
        Ok(JobRunner {
            descriptor,
            origin: JobOrigin::Foreign,
        })
    }
}

/// Raw payload of a foreign message, with its ack handle and source queue
/// merged in for traceability.
fn foreign_payload(message: &dyn InboundMessage) -> Value {
    let attributes: serde_json::Map<String, Value> = message
        .attributes()
        .iter()
        .map(|(name, attr)| (name.clone(), Value::String(attr.string_value.clone())))
        .collect();
    json!({
        "message_id": message.id(),
        "body": message.body(),
        "attributes": attributes,
        "receipt_handle": message.receipt_handle(),
        "queue_url": message.source_queue(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
