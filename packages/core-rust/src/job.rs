//! Job model shared by the enqueue and consume paths.
//!
//! A [`Job`] is what producers hand to the adapter; its serialized form (a
//! [`JobBody`]) travels as the queue entry body and is decoded on the consumer
//! side into a [`JobDescriptor`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized job payload. Keys are the wire field names.
pub type JobBody = serde_json::Map<String, Value>;

/// Body key holding the job identifier. Never part of a deduplication hash.
pub const JOB_ID_KEY: &str = "job_id";

/// A unit of work ready to be enqueued.
///
/// Optional ordering and deduplication settings are explicit fields; when a
/// field is `None` the per-queue default from
/// [`RoutingConfig`](crate::RoutingConfig) applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Unique identifier of this job (usually unique per attempt).
    pub job_id: String,
    /// Name the execution side uses to resolve a handler.
    pub job_class: String,
    /// Logical queue name; resolved to a destination through routing config.
    pub queue_name: String,
    /// Positional job arguments.
    pub arguments: Vec<Value>,
    /// Optional priority hint carried in the body.
    pub priority: Option<i64>,
    /// Number of times this job has been executed so far.
    pub executions: u32,
    /// Per-exception failure counters. Non-empty means the job is being retried.
    pub exception_executions: BTreeMap<String, u32>,
    /// Scheduled execution time in milliseconds since Unix epoch.
    pub scheduled_at: Option<u64>,
    /// Ordering group for ordered (FIFO) destinations.
    pub message_group_id: Option<String>,
    /// Body keys left out of the deduplication hash.
    pub excluded_deduplication_keys: Option<BTreeSet<String>>,
}

impl Job {
    /// Creates a job with no arguments and no scheduling or ordering overrides.
    #[must_use]
    pub fn new(
        job_id: impl Into<String>,
        job_class: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            job_class: job_class.into(),
            queue_name: queue_name.into(),
            arguments: Vec::new(),
            priority: None,
            executions: 0,
            exception_executions: BTreeMap::new(),
            scheduled_at: None,
            message_group_id: None,
            excluded_deduplication_keys: None,
        }
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Schedules the job for the given time (milliseconds since Unix epoch).
    #[must_use]
    pub fn with_scheduled_at(mut self, scheduled_at_ms: u64) -> Self {
        self.scheduled_at = Some(scheduled_at_ms);
        self
    }

    #[must_use]
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn with_exception_execution(mut self, exception: impl Into<String>, count: u32) -> Self {
        self.exception_executions.insert(exception.into(), count);
        self
    }

    /// Excludes the given body keys from deduplication hashing.
    ///
    /// `job_id` is always added to the set.
    #[must_use]
    pub fn deduplicate_without<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        set.insert(JOB_ID_KEY.to_string());
        self.excluded_deduplication_keys = Some(set);
        self
    }

    /// Serializes the job into its wire body.
    ///
    /// Ordering and deduplication settings are routing metadata and are not
    /// part of the body.
    #[must_use]
    pub fn serialize(&self) -> JobBody {
        let mut body = JobBody::new();
        body.insert("job_class".into(), Value::from(self.job_class.as_str()));
        body.insert(JOB_ID_KEY.into(), Value::from(self.job_id.as_str()));
        body.insert("queue_name".into(), Value::from(self.queue_name.as_str()));
        body.insert("priority".into(), self.priority.map_or(Value::Null, Value::from));
        body.insert("arguments".into(), Value::Array(self.arguments.clone()));
        body.insert("executions".into(), Value::from(self.executions));
        body.insert(
            "exception_executions".into(),
            Value::Object(
                self.exception_executions
                    .iter()
                    .map(|(name, count)| (name.clone(), Value::from(*count)))
                    .collect(),
            ),
        );
        body.insert(
            "scheduled_at".into(),
            self.scheduled_at.map_or(Value::Null, Value::from),
        );
        body
    }
}

/// Normalized executable unit handed to the execution side.
///
/// Decoded from the body of a native message, or synthesized for a message
/// produced outside this system. Unknown body fields are preserved in
/// `extra` so the executor sees the full payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_class: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(default)]
    pub executions: u32,
    #[serde(default)]
    pub exception_executions: BTreeMap<String, u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl JobDescriptor {
    /// Creates a descriptor with the given identity and arguments.
    #[must_use]
    pub fn new(job_class: impl Into<String>, job_id: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            job_class: job_class.into(),
            job_id: job_id.into(),
            queue_name: None,
            arguments,
            executions: 0,
            exception_executions: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether earlier attempts of this job failed and recorded retry state.
    #[must_use]
    pub fn has_retry_attempts_remaining(&self) -> bool {
        !self.exception_executions.is_empty()
    }
}
