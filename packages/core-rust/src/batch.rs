//! Batch planning for bulk submission.
//!
//! Jobs are grouped by destination queue (in first-seen order) and each group
//! is chunked into batches no larger than the transport's batch limit.
//! Planning is pure and validates every job up front, so a bad delay or an
//! unknown queue fails before anything is sent.

use std::collections::HashMap;

use crate::config::RoutingConfig;
use crate::entry::{delay_seconds, EntryBuilder, OutboundEntry};
use crate::error::EnqueueError;
use crate::job::Job;

/// Largest number of entries the transport accepts in one batch call.
pub const MAX_BATCH_SIZE: usize = 10;

/// One transport batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Logical queue name shared by every entry.
    pub queue_name: String,
    /// Resolved destination identifier.
    pub destination: String,
    /// At most [`MAX_BATCH_SIZE`] entries, each with a `batch_id`.
    pub entries: Vec<OutboundEntry>,
}

/// Splits a job collection into transport-sized batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner<'a> {
    builder: EntryBuilder<'a>,
}

impl<'a> BatchPlanner<'a> {
    #[must_use]
    pub fn new(routing: &'a RoutingConfig) -> Self {
        Self {
            builder: EntryBuilder::new(routing),
        }
    }

    /// Plans the batches for `jobs`, computing scheduled delays against `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns the first validation, configuration or encoding error hit
    /// while building entries.
    pub fn plan(&self, jobs: &[Job], now_ms: u64) -> Result<Vec<Batch>, EnqueueError> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<&Job>)> = Vec::new();
        for job in jobs {
            let slot = *index.entry(job.queue_name.as_str()).or_insert_with(|| {
                groups.push((job.queue_name.as_str(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(job);
        }

        let mut batches = Vec::new();
        for (queue_name, group) in groups {
            let destination = self.builder.destination_for(queue_name)?;
            for chunk in group.chunks(MAX_BATCH_SIZE) {
                let entries = chunk
                    .iter()
                    .map(|job| self.batch_entry(job, now_ms))
                    .collect::<Result<Vec<_>, _>>()?;
                batches.push(Batch {
                    queue_name: queue_name.to_string(),
                    destination: destination.to_string(),
                    entries,
                });
            }
        }
        Ok(batches)
    }

    fn batch_entry(&self, job: &Job, now_ms: u64) -> Result<OutboundEntry, EnqueueError> {
        let mut entry = self.builder.build(job)?;
        entry.batch_id = Some(job.job_id.clone());
        if let Some(scheduled_at) = job.scheduled_at {
            entry.delay_seconds = Some(delay_seconds(scheduled_at, now_ms)?);
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueSettings;
    use crate::error::ValidationError;

    fn routing() -> RoutingConfig {
        RoutingConfig::default()
            .with_queue("a", QueueSettings::new("https://queue.test/a"))
            .with_queue("b", QueueSettings::new("https://queue.test/b.fifo"))
    }

    fn jobs(queue: &str, count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| Job::new(format!("{queue}-{i}"), "C", queue))
            .collect()
    }

    #[test]
    fn empty_input_plans_nothing() {
        let config = routing();
        assert!(BatchPlanner::new(&config).plan(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn chunks_into_batches_of_ten() {
        let config = routing();
        for (count, expected_batches) in [(1, 1), (10, 1), (11, 2), (25, 3), (30, 3)] {
            let batches = BatchPlanner::new(&config).plan(&jobs("a", count), 0).unwrap();
            assert_eq!(batches.len(), expected_batches, "for {count} jobs");
            assert!(batches.iter().all(|b| b.entries.len() <= MAX_BATCH_SIZE));
            let total: usize = batches.iter().map(|b| b.entries.len()).sum();
            assert_eq!(total, count);
        }
    }

    #[test]
    fn groups_by_queue_in_first_seen_order() {
        let config = routing();
        let mut input = jobs("b", 3);
        input.extend(jobs("a", 12));
        input.push(Job::new("b-late", "C", "b"));

        let batches = BatchPlanner::new(&config).plan(&input, 0).unwrap();
        let shape: Vec<(&str, usize)> = batches
            .iter()
            .map(|b| (b.queue_name.as_str(), b.entries.len()))
            .collect();
        assert_eq!(shape, vec![("b", 4), ("a", 10), ("a", 2)]);
        assert_eq!(batches[0].destination, "https://queue.test/b.fifo");
    }

    #[test]
    fn entries_carry_job_id_as_batch_id() {
        let config = routing();
        let batches = BatchPlanner::new(&config).plan(&jobs("a", 2), 0).unwrap();
        let ids: Vec<_> = batches[0]
            .entries
            .iter()
            .map(|e| e.batch_id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["a-0", "a-1"]);
    }

    #[test]
    fn scheduled_jobs_get_a_delay() {
        let config = routing();
        let input = vec![
            Job::new("now", "C", "a"),
            Job::new("later", "C", "a").with_scheduled_at(61_500),
        ];
        let batches = BatchPlanner::new(&config).plan(&input, 1_000).unwrap();
        assert_eq!(batches[0].entries[0].delay_seconds, None);
        assert_eq!(batches[0].entries[1].delay_seconds, Some(60));
    }

    #[test]
    fn ordered_queue_entries_keep_fifo_metadata() {
        let config = routing();
        let batches = BatchPlanner::new(&config).plan(&jobs("b", 2), 0).unwrap();
        assert!(batches[0].entries.iter().all(OutboundEntry::is_ordered));
    }

    #[test]
    fn invalid_delay_fails_the_whole_plan() {
        let config = routing();
        let mut input = jobs("a", 5);
        input.push(Job::new("far", "C", "a").with_scheduled_at(2_000_000));
        let err = BatchPlanner::new(&config).plan(&input, 0).unwrap_err();
        assert!(matches!(
            err,
            EnqueueError::Validation(ValidationError::DelayTooLong { requested: 2000, .. })
        ));
    }

    #[test]
    fn unknown_queue_fails_the_whole_plan() {
        let config = routing();
        let mut input = jobs("a", 2);
        input.push(Job::new("x", "C", "missing"));
        assert!(matches!(
            BatchPlanner::new(&config).plan(&input, 0),
            Err(EnqueueError::Configuration(_))
        ));
    }
}
