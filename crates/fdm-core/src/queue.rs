//! Minimal priority task queue: the scheduler side of the operator contract.
//!
//! Holds `Arc<dyn Operator>` values, dispatches the highest-priority one
//! first (FIFO among equals), and re-reads each operator's priority at every
//! pop so re-prioritization between dispatches takes effect. Callers
//! re-enqueue an operator after a transition installs new work; `execute` is
//! called exactly once per dispatched entry.

use std::sync::{Arc, Mutex};

use crate::task::Operator;

/// Priority-ordered collection of schedulable tasks.
#[derive(Default)]
pub struct TaskQueue {
    pending: Mutex<Vec<Arc<dyn Operator>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task. Also used to re-enqueue an operator after a
    /// transition replaced its work.
    pub fn push(&self, task: Arc<dyn Operator>) {
        self.pending.lock().unwrap().push(task);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().unwrap().is_empty()
    }

    /// Dispatch the highest-priority pending task (first-enqueued wins a
    /// tie). Returns false if the queue was empty. Priorities are read at
    /// pop time, not enqueue time.
    pub fn dispatch_next(&self) -> bool {
        let task = {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_empty() {
                return false;
            }
            let mut best = 0;
            for (i, task) in pending.iter().enumerate() {
                if task.priority() > pending[best].priority() {
                    best = i;
                }
            }
            pending.remove(best)
        };
        tracing::debug!(priority = task.priority().as_str(), "dispatching task");
        task.execute();
        true
    }

    /// Dispatch until the queue is empty.
    pub fn run_until_idle(&self) {
        while self.dispatch_next() {}
    }
}
