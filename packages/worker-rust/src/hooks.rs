//! Process-wide worker-stop callbacks.
//!
//! Hooks are shared across pool instances. Each pool runs the registered
//! hooks exactly once, when its shutdown sequence completes.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::error;

/// A zero-argument shutdown callback.
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

static GLOBAL_HOOKS: OnceLock<Arc<HookRegistry>> = OnceLock::new();

/// Ordered list of worker-stop callbacks.
#[derive(Default)]
pub struct HookRegistry {
    stop_hooks: Mutex<Vec<StopHook>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by pools built with
    /// [`WorkerPool::new`](crate::pool::WorkerPool::new).
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL_HOOKS.get_or_init(|| Arc::new(Self::new())))
    }

    /// Register a callback to run when a worker pool stops.
    pub fn on_worker_stop<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop_hooks.lock().push(Arc::new(hook));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stop_hooks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stop_hooks.lock().is_empty()
    }

    /// Remove every registered hook.
    pub fn clear(&self) {
        self.stop_hooks.lock().clear();
    }

    /// Run every hook in registration order.
    ///
    /// The list is snapshotted first so a hook may register or clear hooks
    /// without deadlocking. A panicking hook is logged and the rest still run.
    pub fn run_stop_hooks(&self) {
        let hooks = self.stop_hooks.lock().clone();
        for (index, hook) in hooks.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| hook())).is_err() {
                error!(hook = index, "worker stop hook panicked");
            }
        }
    }
}

/// Register a callback on the process-wide registry.
pub fn on_worker_stop<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    HookRegistry::global().on_worker_stop(hook);
}
