//! Seams to the queue transport and the job framework.

use std::collections::BTreeMap;

use async_trait::async_trait;
use drover_core::{JobDescriptor, MessageAttribute};

/// A message delivered by the queue transport.
/// The transport owns the message; the worker only reads it and deletes it
/// once the job has succeeded.
#[async_trait]
pub trait InboundMessage: Send + Sync {
    /// Transport-assigned message id.
    fn id(&self) -> &str;

    /// Raw message body.
    fn body(&self) -> &str;

    /// Typed message attributes.
    fn attributes(&self) -> &BTreeMap<String, MessageAttribute>;

    /// Handle used to acknowledge (delete) this delivery.
    fn receipt_handle(&self) -> &str;

    /// Identifier of the queue the message was received from.
    fn source_queue(&self) -> &str;

    /// Delete the message from its queue. Called at most once, after success.
    async fn delete(&self) -> anyhow::Result<()>;
}

/// Execution entry point of the job framework.
/// Performs the work a descriptor names and reports failure through its error.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: JobDescriptor) -> anyhow::Result<()>;
}

/// Handler for a single job class, registered with a
/// [`JobRegistry`](crate::registry::JobRegistry).
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job class this handler performs (e.g., `"ReportJob"`).
    fn job_class(&self) -> &str;

    /// Perform one job.
    async fn perform(&self, job: &JobDescriptor) -> anyhow::Result<()>;
}
