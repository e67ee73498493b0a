//! Task records and recurrence policies
//!
//! A [`Task`] pairs a named work item with a recurrence policy and a due
//! time. Records are logically immutable: re-arming a task for its next
//! run constructs a fresh record with the same identity and a new due
//! time rather than mutating one that may already be in flight.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared zero-argument work item; cloned cheaply across re-queues
pub type Work = Arc<dyn Fn() + Send + Sync + 'static>;

/// Recurrence policy controlling how a task's next due time is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// Next due time is `dispatch time + interval`, computed before the
    /// work is handed off. The task fires at a fixed cadence regardless
    /// of how long each run takes.
    Period,
    /// Next due time is `completion time + interval`. A fixed gap is kept
    /// between the end of one run and the start of the next.
    Fixed,
}

/// One schedulable unit of work
///
/// Ordering (`Ord`, `Eq`) compares `due_at` only, which is what the due
/// queue keys on; ties break arbitrarily. Logical identity is the `id`
/// string, compared explicitly where membership matters (removal).
#[derive(Clone)]
pub struct Task {
    id: String,
    work: Work,
    interval: Duration,
    policy: Policy,
    due_at: Instant,
}

impl Task {
    /// Create a task due at the given instant
    pub fn new(
        id: impl Into<String>,
        work: Work,
        interval: Duration,
        policy: Policy,
        due_at: Instant,
    ) -> Self {
        Self {
            id: id.into(),
            work,
            interval,
            policy,
            due_at,
        }
    }

    /// Build the next-generation record for this logical task: same id,
    /// work, interval, and policy, with a fresh due time
    pub fn rearmed(&self, due_at: Instant) -> Self {
        Self {
            id: self.id.clone(),
            work: Arc::clone(&self.work),
            interval: self.interval,
            policy: self.policy,
            due_at,
        }
    }

    /// Logical identity of the task
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the task's work item
    pub fn work(&self) -> Work {
        Arc::clone(&self.work)
    }

    /// Recurrence interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Recurrence policy
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Instant at or after which the task is eligible for dispatch
    pub fn due_at(&self) -> Instant {
        self.due_at
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due_at.cmp(&other.due_at)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("due_at", &self.due_at)
            .field("interval", &self.interval)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Read-only view of a queued task, for introspection and logging
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    /// Task id
    pub id: String,
    /// Recurrence policy
    pub policy: Policy,
    /// Recurrence interval
    pub interval: Duration,
    /// Time remaining until the task is due (zero if already due)
    pub due_in: Duration,
}

impl TaskSnapshot {
    /// Snapshot a queued task relative to `now`
    pub fn of(task: &Task, now: Instant) -> Self {
        Self {
            id: task.id().to_string(),
            policy: task.policy(),
            interval: task.interval(),
            due_in: task.due_at().saturating_duration_since(now),
        }
    }
}
