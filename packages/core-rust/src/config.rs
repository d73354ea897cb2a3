//! Queue routing configuration.
//!
//! Everything the core needs to know about queues is resolved once at
//! startup into a [`RoutingConfig`]: where each logical queue lives, which
//! ordering group and deduplication exclusions apply by default, and which
//! job class handles messages that were not produced by this system.
//! Loading the values (files, environment, service discovery) is up to the
//! embedding application; the types deserialize with `serde`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Group id used for ordered destinations when neither the job nor the
/// queue provides one.
pub const DEFAULT_MESSAGE_GROUP_ID: &str = "drover-default-group";

/// Per-queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Destination identifier (queue URL). A `.fifo` suffix marks an ordered queue.
    pub url: String,
    /// Default ordering group for jobs on this queue.
    #[serde(default)]
    pub message_group_id: Option<String>,
    /// Default deduplication exclusions for jobs on this queue.
    #[serde(default)]
    pub excluded_deduplication_keys: Option<Vec<String>>,
    /// Job class that handles foreign messages delivered on this queue.
    #[serde(default)]
    pub job_class: Option<String>,
}

impl QueueSettings {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message_group_id: None,
            excluded_deduplication_keys: None,
            job_class: None,
        }
    }

    #[must_use]
    pub fn with_message_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.message_group_id = Some(group_id.into());
        self
    }

    #[must_use]
    pub fn with_excluded_deduplication_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_deduplication_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_job_class(mut self, job_class: impl Into<String>) -> Self {
        self.job_class = Some(job_class.into());
        self
    }
}

/// Routing table for all queues known to this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Logical queue name -> settings.
    pub queues: BTreeMap<String, QueueSettings>,
    /// System-wide default ordering group.
    pub message_group_id: String,
    /// System-wide default deduplication exclusions.
    pub excluded_deduplication_keys: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            queues: BTreeMap::new(),
            message_group_id: DEFAULT_MESSAGE_GROUP_ID.to_string(),
            excluded_deduplication_keys: Vec::new(),
        }
    }
}

impl RoutingConfig {
    /// Adds (or replaces) the settings for a logical queue.
    #[must_use]
    pub fn with_queue(mut self, queue_name: impl Into<String>, settings: QueueSettings) -> Self {
        self.queues.insert(queue_name.into(), settings);
        self
    }

    /// Parses a routing table from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid JSON or a queue entry lacks a `url`.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Resolves a logical queue name to its destination identifier.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownQueue` if the queue is not configured.
    pub fn url_for(&self, queue_name: &str) -> Result<&str, ConfigurationError> {
        self.queues
            .get(queue_name)
            .map(|settings| settings.url.as_str())
            .ok_or_else(|| ConfigurationError::UnknownQueue {
                queue_name: queue_name.to_string(),
            })
    }

    /// Default ordering group for a queue: queue setting, else the system default.
    #[must_use]
    pub fn message_group_id_for(&self, queue_name: &str) -> &str {
        self.queues
            .get(queue_name)
            .and_then(|settings| settings.message_group_id.as_deref())
            .unwrap_or(self.message_group_id.as_str())
    }

    /// Default deduplication exclusions for a queue: queue setting, else the
    /// system default.
    #[must_use]
    pub fn excluded_deduplication_keys_for(&self, queue_name: &str) -> BTreeSet<String> {
        self.queues
            .get(queue_name)
            .and_then(|settings| settings.excluded_deduplication_keys.as_ref())
            .unwrap_or(&self.excluded_deduplication_keys)
            .iter()
            .cloned()
            .collect()
    }

    /// Destination identifier -> handler job class, for every queue that
    /// declares one.
    #[must_use]
    pub fn foreign_handlers(&self) -> HashMap<String, String> {
        self.queues
            .values()
            .filter_map(|settings| {
                settings
                    .job_class
                    .as_ref()
                    .map(|class| (settings.url.clone(), class.clone()))
            })
            .collect()
    }
}
