//! Drover worker: inbound message classification and a bounded job execution pool.
//!
//! Messages are classified as native (produced by `drover-core`) or foreign,
//! run through a [`JobExecutor`], and deleted from their queue only after the
//! job succeeds.

pub mod classify;
pub mod error;
pub mod hooks;
pub mod pool;
pub mod registry;
pub mod telemetry;
pub mod traits;

#[cfg(test)]
mod testing;

pub use classify::{JobOrigin, JobRunner, MessageClassifier};
pub use error::{ClassifyError, ExecutionError, PoolError, UnknownJobClass};
pub use hooks::{on_worker_stop, HookRegistry, StopHook};
pub use pool::{ErrorHandler, PoolConfig, PoolState, ShutdownOutcome, WorkerPool};
pub use registry::JobRegistry;
pub use telemetry::{init_tracing, LogFormat};
pub use traits::{InboundMessage, JobExecutor, JobHandler};
