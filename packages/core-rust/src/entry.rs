//! Outbound entry construction.
//!
//! [`EntryBuilder`] turns a [`Job`] into a transport-ready [`OutboundEntry`]:
//! serialized body, native-message attributes, and, for ordered destinations,
//! deduplication and group metadata. Building is pure; sending is the
//! transport's job.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::RoutingConfig;
use crate::error::{ConfigurationError, EnqueueError, ValidationError};
use crate::hash::deduplication_id;
use crate::job::{Job, JobBody, JOB_ID_KEY};

/// Longest delay the transport supports, in seconds (15 minutes).
pub const MAX_DELAY_SECONDS: u64 = 900;

/// Attribute carrying the producing job class. Its presence marks a native message.
pub const JOB_CLASS_ATTRIBUTE: &str = "drover_job_class";

/// Attribute carrying the protocol version of the producer.
pub const PROTOCOL_VERSION_ATTRIBUTE: &str = "drover_job_version";

/// Protocol version written into every native entry.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Naming convention for ordered destinations.
pub const FIFO_SUFFIX: &str = ".fifo";

/// Data type tag for string-valued attributes.
pub const STRING_DATA_TYPE: &str = "String";

/// A typed message attribute, as carried by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttribute {
    pub string_value: String,
    pub data_type: String,
}

impl MessageAttribute {
    /// Creates a `String`-typed attribute.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: value.into(),
            data_type: STRING_DATA_TYPE.to_string(),
        }
    }
}

/// Transport-ready queue entry.
///
/// `deduplication_id` and `group_id` are either both present (ordered
/// destination) or both absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEntry {
    /// Serialized job body.
    pub body: String,
    /// Message attributes; always includes the native-message tags.
    pub attributes: BTreeMap<String, MessageAttribute>,
    /// Delivery delay in seconds, within `0..=MAX_DELAY_SECONDS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u32>,
    /// Ordering partition key (ordered destinations only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Content hash used by ordered destinations to drop duplicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication_id: Option<String>,
    /// Entry id unique within a batch submission (the job id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

impl OutboundEntry {
    /// Whether this entry carries ordered-destination metadata.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.deduplication_id.is_some()
    }
}

/// Whether a destination identifier names an ordered (FIFO) queue.
#[must_use]
pub fn is_fifo(destination: &str) -> bool {
    destination.ends_with(FIFO_SUFFIX)
}

/// Whole seconds from `now_ms` until `scheduled_at_ms`, floored.
///
/// Times in the past yield 0.
///
/// # Errors
///
/// Returns `ValidationError::DelayTooLong` if the delay exceeds
/// [`MAX_DELAY_SECONDS`].
pub fn delay_seconds(scheduled_at_ms: u64, now_ms: u64) -> Result<u32, ValidationError> {
    let delay = scheduled_at_ms.saturating_sub(now_ms) / 1000;
    if delay > MAX_DELAY_SECONDS {
        return Err(ValidationError::DelayTooLong {
            requested: delay,
            max: MAX_DELAY_SECONDS,
        });
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(delay as u32)
}

/// Builds outbound entries against a routing table.
#[derive(Debug, Clone, Copy)]
pub struct EntryBuilder<'a> {
    routing: &'a RoutingConfig,
}

impl<'a> EntryBuilder<'a> {
    #[must_use]
    pub fn new(routing: &'a RoutingConfig) -> Self {
        Self { routing }
    }

    /// Destination identifier for a logical queue name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownQueue` if the queue is not configured.
    pub fn destination_for(&self, queue_name: &str) -> Result<&'a str, ConfigurationError> {
        self.routing.url_for(queue_name)
    }

    /// Builds the entry for `job`, serializing its body.
    ///
    /// # Errors
    ///
    /// Returns `EnqueueError::Configuration` if the job's queue is not
    /// configured, or `EnqueueError::Encode` if the body cannot be encoded.
    pub fn build(&self, job: &Job) -> Result<OutboundEntry, EnqueueError> {
        self.build_with_body(job, None)
    }

    /// Builds the entry for `job` using a pre-serialized body when given.
    ///
    /// # Errors
    ///
    /// Same as [`EntryBuilder::build`].
    pub fn build_with_body(
        &self,
        job: &Job,
        body: Option<JobBody>,
    ) -> Result<OutboundEntry, EnqueueError> {
        let destination = self.destination_for(&job.queue_name)?;
        let body = body.unwrap_or_else(|| job.serialize());

        let mut entry = OutboundEntry {
            body: serde_json::to_string(&body)?,
            attributes: native_attributes(job),
            delay_seconds: None,
            group_id: None,
            deduplication_id: None,
            batch_id: None,
        };

        if is_fifo(destination) {
            entry.deduplication_id = Some(deduplication_id(&body, &self.excluded_keys(job)));
            entry.group_id = Some(self.group_id(job).to_string());
        }

        Ok(entry)
    }

    /// Keys left out of the deduplication hash: job override, queue default,
    /// and `job_id`.
    #[must_use]
    pub fn excluded_keys(&self, job: &Job) -> BTreeSet<String> {
        let mut keys = self.routing.excluded_deduplication_keys_for(&job.queue_name);
        if let Some(job_keys) = &job.excluded_deduplication_keys {
            keys.extend(job_keys.iter().cloned());
        }
        keys.insert(JOB_ID_KEY.to_string());
        keys
    }

    /// Ordering group: job override, else queue default, else system default.
    #[must_use]
    pub fn group_id<'j>(&self, job: &'j Job) -> &'j str
    where
        'a: 'j,
    {
        job.message_group_id
            .as_deref()
            .unwrap_or_else(|| self.routing.message_group_id_for(&job.queue_name))
    }
}

fn native_attributes(job: &Job) -> BTreeMap<String, MessageAttribute> {
    BTreeMap::from([
        (
            JOB_CLASS_ATTRIBUTE.to_string(),
            MessageAttribute::string(job.job_class.as_str()),
        ),
        (
            PROTOCOL_VERSION_ATTRIBUTE.to_string(),
            MessageAttribute::string(PROTOCOL_VERSION),
        ),
    ])
}
