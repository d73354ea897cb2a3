//! Drover core: job model, queue routing, entry building and batch planning.
//!
//! This crate covers the enqueue side of the engine. The consume side (message
//! classification and the worker pool) lives in `drover-worker`.

pub mod adapter;
pub mod batch;
pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod hash;
pub mod job;
pub mod traits;

pub use adapter::QueueAdapter;
pub use batch::{Batch, BatchPlanner, MAX_BATCH_SIZE};
pub use clock::{ClockSource, SystemClock};
pub use config::{QueueSettings, RoutingConfig, DEFAULT_MESSAGE_GROUP_ID};
pub use entry::{
    delay_seconds, is_fifo, EntryBuilder, MessageAttribute, OutboundEntry, JOB_CLASS_ATTRIBUTE,
    MAX_DELAY_SECONDS, PROTOCOL_VERSION, PROTOCOL_VERSION_ATTRIBUTE,
};
pub use error::{ConfigurationError, EnqueueError, ValidationError};
pub use job::{Job, JobBody, JobDescriptor, JOB_ID_KEY};
pub use traits::Transport;
