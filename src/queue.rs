//! Due-time queue
//!
//! Min-heap of task records keyed by due time. Not internally thread-safe:
//! all access is serialized by the scheduler's state mutex.

use crate::task::Task;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Tasks ordered by ascending due time
#[derive(Debug, Default)]
pub struct DueQueue {
    heap: BinaryHeap<Reverse<Task>>,
}

impl DueQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Insert a task, O(log n)
    pub fn insert(&mut self, task: Task) {
        self.heap.push(Reverse(task));
    }

    /// Borrow the earliest-due task without removing it
    pub fn peek_min(&self) -> Option<&Task> {
        self.heap.peek().map(|Reverse(task)| task)
    }

    /// Remove and return the earliest-due task, O(log n)
    pub fn pop_min(&mut self) -> Option<Task> {
        self.heap.pop().map(|Reverse(task)| task)
    }

    /// Remove every task matching the predicate, returning how many were
    /// removed. O(n); used only for explicit cancellation.
    pub fn remove_where(&mut self, pred: impl Fn(&Task) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|Reverse(task)| !pred(task));
        before - self.heap.len()
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue holds no tasks
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Iterate over queued tasks in arbitrary (heap) order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.heap.iter().map(|Reverse(task)| task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Policy, Work};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn noop() -> Work {
        Arc::new(|| {})
    }

    fn task_due(id: &str, due_at: Instant) -> Task {
        Task::new(id, noop(), Duration::from_secs(1), Policy::Period, due_at)
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = DueQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert!(queue.peek_min().is_none());
        assert!(queue.pop_min().is_none());
    }

    #[test]
    fn test_pop_in_due_order() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("c", now + Duration::from_secs(3)));
        queue.insert(task_due("a", now + Duration::from_secs(1)));
        queue.insert(task_due("b", now + Duration::from_secs(2)));

        assert_eq!(queue.pop_min().unwrap().id(), "a");
        assert_eq!(queue.pop_min().unwrap().id(), "b");
        assert_eq!(queue.pop_min().unwrap().id(), "c");
        assert!(queue.pop_min().is_none());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("a", now));

        assert_eq!(queue.peek_min().unwrap().id(), "a");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_min().unwrap().id(), "a");
    }

    #[test]
    fn test_insert_earlier_preempts_peek() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("late", now + Duration::from_secs(10)));
        assert_eq!(queue.peek_min().unwrap().id(), "late");

        queue.insert(task_due("early", now + Duration::from_secs(1)));
        assert_eq!(queue.peek_min().unwrap().id(), "early");
    }

    #[test]
    fn test_remove_where_by_id() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("keep", now + Duration::from_secs(1)));
        queue.insert(task_due("drop", now + Duration::from_secs(2)));
        queue.insert(task_due("drop", now + Duration::from_secs(3)));

        let removed = queue.remove_where(|t| t.id() == "drop");
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_min().unwrap().id(), "keep");
    }

    #[test]
    fn test_remove_where_no_match() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("a", now));

        assert_eq!(queue.remove_where(|t| t.id() == "missing"), 0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_equal_due_times_all_surface() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("a", now));
        queue.insert(task_due("b", now));

        // Tie order is arbitrary, but both entries must come out
        let mut ids = vec![
            queue.pop_min().unwrap().id().to_string(),
            queue.pop_min().unwrap().id().to_string(),
        ];
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_iter_sees_all_entries() {
        let now = Instant::now();
        let mut queue = DueQueue::new();
        queue.insert(task_due("a", now + Duration::from_secs(1)));
        queue.insert(task_due("b", now + Duration::from_secs(2)));

        assert_eq!(queue.iter().count(), 2);
    }
}
