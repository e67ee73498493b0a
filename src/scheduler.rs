//! Scheduler core - due-time loop, wake/sleep protocol, and public API
//!
//! One dedicated thread owns the due-time queue and:
//! - Sleeps until the earliest task is due, or indefinitely when idle
//! - Wakes early whenever an earlier-due task is inserted
//! - Pops due tasks and hands their work to the task runner
//! - Runs pre/post-dispatch hooks inline, which is also how the two
//!   recurrence policies re-queue their tasks

use crate::clock::{Clock, SystemClock};
use crate::error::{PacerError, Result};
use crate::hooks::{DispatchHook, HookList};
use crate::queue::DueQueue;
use crate::runner::{Completion, Job, TaskRunner, ThreadRunner};
use crate::task::{Policy, Task, TaskSnapshot, Work};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Name of the scheduling loop thread
const LOOP_THREAD_NAME: &str = "pacer-scheduler";

/// How often a Fixed-completion wait re-checks the shutdown flag
const COMPLETION_POLL: Duration = Duration::from_millis(10);

/// Lock a mutex, recovering the guard if a panicking worker poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Queue plus shutdown flag, guarded together so the loop observes both
/// atomically on every wake
struct State {
    queue: DueQueue,
    shutdown: bool,
}

/// Everything shared between the public handle, the loop thread, and the
/// built-in re-queue hooks
struct Shared {
    state: Mutex<State>,
    cv: Condvar,
    clock: Arc<dyn Clock>,
    runner: Mutex<Arc<dyn TaskRunner>>,
    pre_hooks: Mutex<HookList>,
    post_hooks: Mutex<HookList>,
}

impl Shared {
    /// Insert a task and wake the loop so it re-evaluates its deadline
    fn insert(&self, task: Task) {
        let mut state = lock(&self.state);
        state.queue.insert(task);
        self.cv.notify_all();
    }
}

/// Periodic task scheduler
///
/// Construct with [`Scheduler::new`], register tasks, then [`start`]
/// the scheduling loop. Tasks with the same id may coexist in the queue;
/// [`remove_task`] purges every queued entry with a given id but cannot
/// cancel a task already popped for execution.
///
/// [`start`]: Scheduler::start
/// [`remove_task`]: Scheduler::remove_task
pub struct Scheduler {
    shared: Arc<Shared>,
    loop_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler with the system clock and the default
    /// thread-per-job runner
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a scheduler with a custom clock
    pub fn with_clock(clock: impl Clock) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: DueQueue::new(),
                shutdown: false,
            }),
            cv: Condvar::new(),
            clock: Arc::new(clock),
            runner: Mutex::new(Arc::new(ThreadRunner)),
            pre_hooks: Mutex::new(HookList::new()),
            post_hooks: Mutex::new(HookList::new()),
        });

        // The built-in re-queue behavior is two ordinary hooks. Period
        // tasks re-arm before the work is handed off, so their cadence is
        // independent of run duration; Fixed tasks re-arm after the run
        // completed. Weak references keep the hooks from cycling the Arc.
        lock(&shared.pre_hooks).push(requeue_hook(Arc::downgrade(&shared), Policy::Period));
        lock(&shared.post_hooks).push(requeue_hook(Arc::downgrade(&shared), Policy::Fixed));

        Self {
            shared,
            loop_thread: Mutex::new(None),
        }
    }

    /// Start the scheduling loop thread
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::AlreadyStarted`] if the loop is running, or
    /// [`PacerError::Spawn`] if the OS refuses the thread.
    pub fn start(&self) -> Result<()> {
        let mut handle = lock(&self.loop_thread);
        if handle.is_some() {
            return Err(PacerError::AlreadyStarted);
        }

        lock(&self.shared.state).shutdown = false;
        let shared = Arc::clone(&self.shared);
        let joined = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || run_loop(&shared))?;
        *handle = Some(joined);
        info!("scheduler started");
        Ok(())
    }

    /// Stop the scheduling loop and join its thread
    ///
    /// The loop checks the shutdown flag after every wake, including
    /// while waiting out a `Fixed` run, so stop returns promptly even if
    /// a work item is still running (the work itself is fire-and-forget
    /// and keeps going on its worker). A `Fixed` task interrupted this
    /// way is not re-queued. Queued tasks stay queued and fire again
    /// after a later [`start`](Scheduler::start).
    ///
    /// # Errors
    ///
    /// Returns [`PacerError::NotRunning`] if the loop was never started,
    /// or [`PacerError::LoopPanicked`] if its thread died unwinding.
    pub fn stop(&self) -> Result<()> {
        let mut handle = lock(&self.loop_thread);
        let Some(joined) = handle.take() else {
            return Err(PacerError::NotRunning);
        };

        {
            let mut state = lock(&self.shared.state);
            state.shutdown = true;
            self.shared.cv.notify_all();
        }

        joined.join().map_err(|_| PacerError::LoopPanicked)?;
        info!("scheduler stopped");
        Ok(())
    }

    /// Register a task
    ///
    /// The first due time is now (if `run_immediately`) or now plus
    /// `interval`. Registering an id that is already queued adds a second
    /// independent entry; both fire, and [`remove_task`] purges both.
    ///
    /// [`remove_task`]: Scheduler::remove_task
    pub fn add_task(
        &self,
        id: impl Into<String>,
        work: impl Fn() + Send + Sync + 'static,
        interval: Duration,
        policy: Policy,
        run_immediately: bool,
    ) {
        let now = self.shared.clock.now();
        let due_at = if run_immediately { now } else { now + interval };
        let task = Task::new(id, Arc::new(work) as Work, interval, policy, due_at);
        debug!(
            task_id = task.id(),
            ?policy,
            ?interval,
            run_immediately,
            "task added"
        );
        self.shared.insert(task);
    }

    /// Remove every queued entry with the given id, returning how many
    /// were purged
    ///
    /// A no-op (returns 0) if the id is absent. An entry already popped
    /// for execution is not affected; for a recurring task the re-queued
    /// entry is what this removes.
    pub fn remove_task(&self, id: &str) -> usize {
        let removed = lock(&self.shared.state).queue.remove_where(|t| t.id() == id);
        if removed > 0 {
            debug!(task_id = id, removed, "task removed");
        }
        removed
    }

    /// Append a hook that runs before each dispatch, after all previously
    /// registered pre-dispatch hooks
    ///
    /// Hooks run inline on the scheduler thread and must stay quick; a
    /// blocked hook stalls all future dispatch. Hooks may register
    /// further hooks, which take effect from the next dispatch.
    pub fn add_pre_dispatch_hook(&self, hook: impl Fn(&Task) + Send + Sync + 'static) {
        lock(&self.shared.pre_hooks).push(Arc::new(hook) as DispatchHook);
    }

    /// Append a hook that runs after each dispatch
    ///
    /// For `Fixed` tasks the dispatch is considered complete only once
    /// the work finished, so post-dispatch hooks observe completion time.
    pub fn add_post_dispatch_hook(&self, hook: impl Fn(&Task) + Send + Sync + 'static) {
        lock(&self.shared.post_hooks).push(Arc::new(hook) as DispatchHook);
    }

    /// Replace the task runner; takes effect for subsequent dispatches
    pub fn set_runner(&self, runner: Arc<dyn TaskRunner>) {
        *lock(&self.shared.runner) = runner;
    }

    /// Number of queued (not in-flight) tasks
    pub fn len(&self) -> usize {
        lock(&self.shared.state).queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        lock(&self.shared.state).queue.is_empty()
    }

    /// Snapshot the queued tasks, in arbitrary order
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        let now = self.shared.clock.now();
        lock(&self.shared.state)
            .queue
            .iter()
            .map(|task| TaskSnapshot::of(task, now))
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Best effort: a dropped scheduler must not leak its loop thread
        let _ = self.stop();
    }
}

/// Build the re-queue hook for one policy: re-arm matching tasks at
/// `now + interval` and wake the loop
fn requeue_hook(shared: std::sync::Weak<Shared>, policy: Policy) -> DispatchHook {
    Arc::new(move |task: &Task| {
        if task.policy() != policy {
            return;
        }
        if let Some(shared) = shared.upgrade() {
            let due_at = shared.clock.now() + task.interval();
            shared.insert(task.rearmed(due_at));
        }
    })
}

/// The scheduling loop: wait for the earliest due time, pop, dispatch
fn run_loop(shared: &Shared) {
    loop {
        let mut state = lock(&shared.state);
        let task = loop {
            if state.shutdown {
                return;
            }
            // Re-check on every wake: a wake may be a new earlier-due
            // insertion, a shutdown, a spurious wakeup, or the deadline
            // elapsing. All converge on the same peek.
            let next_due = state.queue.peek_min().map(Task::due_at);
            state = match next_due {
                None => shared.cv.wait(state).unwrap_or_else(|e| e.into_inner()),
                Some(due_at) => {
                    let now = shared.clock.now();
                    if due_at <= now {
                        break state.queue.pop_min();
                    }
                    shared
                        .cv
                        .wait_timeout(state, due_at - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        };
        drop(state);

        let Some(task) = task else { continue };
        debug!(task_id = task.id(), policy = ?task.policy(), "dispatching");

        // Dispatch never holds the queue lock or a hook-list lock: hooks
        // and the runner may themselves add or remove tasks, and hooks
        // may register further hooks. The lists are snapshotted (cheap
        // Arc clones) before running.
        let pre_hooks = lock(&shared.pre_hooks).clone();
        pre_hooks.run(&task);
        let completion = dispatch(shared, &task);
        if task.policy() == Policy::Fixed {
            // "After dispatch" for Fixed means after the run finished, so
            // the post-dispatch re-queue measures from completion time.
            // A long Fixed run therefore delays other dispatches. The
            // wait keeps observing the shutdown flag so stop() is never
            // held hostage by a long or stuck work item; on shutdown the
            // interrupted task is simply not re-queued.
            if !wait_for_completion(shared, &completion) {
                return;
            }
        }
        let post_hooks = lock(&shared.post_hooks).clone();
        post_hooks.run(&task);
    }
}

/// Wait for a Fixed run to finish, re-checking the shutdown flag between
/// slices; returns false when shutdown was requested before completion
fn wait_for_completion(shared: &Shared, completion: &Completion) -> bool {
    loop {
        if completion.wait_timeout(COMPLETION_POLL) {
            return true;
        }
        if lock(&shared.state).shutdown {
            return false;
        }
    }
}

/// Wrap the task's work with a completion signal and hand it to the
/// current runner, fire-and-forget
fn dispatch(shared: &Shared, task: &Task) -> Completion {
    let completion = Completion::new();
    let signal = completion.clone();
    let work = task.work();
    let task_id = task.id().to_string();
    let job: Job = Box::new(move || {
        // The signal must fire even when the work panics, or a Fixed
        // task would wedge the loop forever.
        if catch_unwind(AssertUnwindSafe(|| work())).is_err() {
            error!(task_id = %task_id, "task work panicked");
        }
        signal.finish();
    });

    let runner = Arc::clone(&lock(&shared.runner));
    runner.spawn(job);
    completion
}
