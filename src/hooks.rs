//! Dispatch hooks
//!
//! Ordered lists of callbacks run inline on the scheduler thread around
//! each dispatch. The built-in re-queue behavior for both recurrence
//! policies is implemented as two ordinary hooks installed at
//! construction, indistinguishable from user-added ones.

use crate::task::Task;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

/// Callback invoked with the task record being dispatched
pub type DispatchHook = Arc<dyn Fn(&Task) + Send + Sync + 'static>;

/// Ordered list of dispatch hooks
///
/// Hooks run in registration order. A panicking hook is logged and
/// skipped so one misbehaving callback cannot halt all scheduling; a
/// hook that blocks forever still stalls dispatch, which is why hooks
/// must stay quick.
///
/// Cloning is cheap (a vector of `Arc` handles); the scheduler clones
/// the list out of its registration lock before running it, so hooks
/// may themselves register further hooks, which take effect from the
/// next dispatch.
#[derive(Clone, Default)]
pub struct HookList {
    hooks: Vec<DispatchHook>,
}

impl HookList {
    /// Create an empty hook list
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append a hook; it runs after all previously registered hooks
    pub fn push(&mut self, hook: DispatchHook) {
        self.hooks.push(hook);
    }

    /// Run every hook against the task, isolating panics per hook
    pub fn run(&self, task: &Task) {
        for hook in &self.hooks {
            if catch_unwind(AssertUnwindSafe(|| hook(task))).is_err() {
                error!(task_id = task.id(), "dispatch hook panicked; skipping");
            }
        }
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
