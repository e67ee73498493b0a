//! Task runners
//!
//! The scheduler hands each due work item to a [`TaskRunner`] and never
//! blocks on it directly; completion is observed through a [`Completion`]
//! signal only where the fixed-delay policy needs it. Two runners are
//! provided: one OS thread per job (default) and a tokio bridge.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use tracing::error;

/// One dispatched unit of work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes work items asynchronously relative to the scheduler
///
/// Implementations must be fire-and-forget: `spawn` returns once the job
/// is handed off, and must not panic back into the caller.
pub trait TaskRunner: Send + Sync {
    /// Hand off a job for execution
    fn spawn(&self, job: Job);
}

/// Default runner: one named OS thread per job
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRunner;

impl TaskRunner for ThreadRunner {
    fn spawn(&self, job: Job) {
        let spawned = thread::Builder::new()
            .name("pacer-worker".to_string())
            .spawn(job);
        if let Err(err) = spawned {
            error!(%err, "failed to spawn worker thread; dropping job");
        }
    }
}

/// Runner that dispatches onto an existing tokio runtime's blocking pool
#[derive(Debug, Clone)]
pub struct TokioRunner {
    handle: tokio::runtime::Handle,
}

impl TokioRunner {
    /// Create a runner bound to the given runtime handle
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl TaskRunner for TokioRunner {
    fn spawn(&self, job: Job) {
        self.handle.spawn_blocking(job);
    }
}

/// Level-triggered completion signal
///
/// The scheduler wraps each work item so the signal fires exactly once
/// when the run finishes (including on panic); `wait` blocks until then.
/// Cloning yields another handle to the same signal.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Completion {
    /// Create an unfired signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the run finished and wake all waiters
    pub fn finish(&self) {
        let (done, cv) = &*self.inner;
        let mut done = done.lock().unwrap_or_else(|e| e.into_inner());
        *done = true;
        cv.notify_all();
    }

    /// Whether the run has finished
    pub fn is_finished(&self) -> bool {
        let (done, _) = &*self.inner;
        *done.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until the run finishes
    pub fn wait(&self) {
        let (done, cv) = &*self.inner;
        let mut done = done.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            done = cv.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until the run finishes or the timeout elapses; returns
    /// whether it finished
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let (done, cv) = &*self.inner;
        let mut done = done.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            done = cv
                .wait_timeout(done, deadline - now)
                .unwrap_or_else(|e| e.into_inner())
                .0;
        }
        true
    }
}
