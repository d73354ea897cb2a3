//! In-test doubles shared by the worker test modules.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use drover_core::{JobDescriptor, MessageAttribute};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::traits::{InboundMessage, JobExecutor};

/// Inbound message that counts deletes.
pub struct RecordingMessage {
    id: String,
    body: String,
    attributes: BTreeMap<String, MessageAttribute>,
    receipt_handle: String,
    source_queue: String,
    deletes: AtomicUsize,
    fail_delete: AtomicBool,
}

impl RecordingMessage {
    pub fn new(id: &str, body: impl Into<String>, source_queue: &str) -> Self {
        Self {
            id: id.to_string(),
            body: body.into(),
            attributes: BTreeMap::new(),
            receipt_handle: format!("rh-{id}"),
            source_queue: source_queue.to_string(),
            deletes: AtomicUsize::new(0),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, MessageAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .insert(name.to_string(), MessageAttribute::string(value));
        self
    }

    pub fn with_receipt_handle(mut self, handle: &str) -> Self {
        self.receipt_handle = handle.to_string();
        self
    }

    pub fn failing_delete(self) -> Self {
        self.fail_delete.store(true, Ordering::SeqCst);
        self
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InboundMessage for RecordingMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn attributes(&self) -> &BTreeMap<String, MessageAttribute> {
        &self.attributes
    }

    fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }

    fn source_queue(&self) -> &str {
        &self.source_queue
    }

    async fn delete(&self) -> anyhow::Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            anyhow::bail!("delete rejected");
        }
        Ok(())
    }
}

/// Scripted executor: records job ids, fails the listed ones, and can hold
/// every job until the test releases it.
pub struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
    failing: HashSet<String>,
    gate: Option<Semaphore>,
    started: AtomicUsize,
}

impl RecordingExecutor {
    pub fn succeeding() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            failing: HashSet::new(),
            gate: None,
            started: AtomicUsize::new(0),
        }
    }

    pub fn failing_on<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            failing: ids.into_iter().map(str::to_string).collect(),
            ..Self::succeeding()
        }
    }

    /// Every job waits for a [`release`](Self::release) before finishing.
    pub fn blocking() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::succeeding()
        }
    }

    pub fn release(&self, jobs: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(jobs);
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn executed_ids(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl JobExecutor for RecordingExecutor {
    async fn execute(&self, job: JobDescriptor) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        self.executed.lock().push(job.job_id.clone());
        if self.failing.contains(&job.job_id) {
            anyhow::bail!("job {} failed", job.job_id);
        }
        Ok(())
    }
}
