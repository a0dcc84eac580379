//! Task operators: a schedulable, priority-tagged deferred computation.
//!
//! The scheduler holds `Arc<dyn Operator>` values, re-reads `priority()`
//! before every scheduling decision, and calls `execute()` at most once per
//! installed work generation. `TaskOperator` is the plain closure-backed
//! unit; `download::FileDownloadOperator` implements the same traits with a
//! full lifecycle state machine behind them.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Scheduling priority, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Normal,
        }
    }
}

/// The deferred computation a task holds. Replaced wholesale on every
/// update, never mutated in place.
pub type Work = Box<dyn FnOnce() + Send>;

/// Something the scheduler can run.
pub trait Executable {
    /// Invoke the current work on the calling context.
    ///
    /// # Panics
    ///
    /// Panics if no work is installed. The scheduler must guarantee work is
    /// set before dispatch (at most one `execute` per work generation); a
    /// violation is a programming error, not a runtime condition.
    fn execute(&self);
}

/// Something with a scheduler-visible priority.
pub trait Prioritized {
    fn priority(&self) -> TaskPriority;
    fn set_priority(&self, priority: TaskPriority);
}

/// Combined capability bound the queue stores trait objects under.
pub trait Operator: Executable + Prioritized + Send + Sync {}

impl<T: Executable + Prioritized + Send + Sync> Operator for T {}

/// Single-slot holder for the current work, tracking a generation counter.
///
/// Each `replace` bumps the generation; `take` consumes the slot so the same
/// generation can never run twice. Re-arming after a state-changing update
/// (and therefore re-executing) is expected.
pub struct WorkCell {
    slot: Mutex<Slot>,
}

struct Slot {
    work: Option<Work>,
    generation: u64,
}

impl WorkCell {
    pub fn new(work: Work) -> Self {
        Self {
            slot: Mutex::new(Slot {
                work: Some(work),
                generation: 0,
            }),
        }
    }

    /// Install new work, superseding whatever was there. Returns the new generation.
    pub fn replace(&self, work: Work) -> u64 {
        let mut slot = self.slot.lock().unwrap();
        slot.work = Some(work);
        slot.generation += 1;
        slot.generation
    }

    /// Consume the current work, leaving the slot empty.
    pub fn take(&self) -> Option<Work> {
        self.slot.lock().unwrap().work.take()
    }

    /// Whether work is currently installed (i.e. the task is schedulable).
    pub fn is_armed(&self) -> bool {
        self.slot.lock().unwrap().work.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.slot.lock().unwrap().generation
    }
}

/// A plain unit of work with a priority: the base task kind.
///
/// Construction takes work and priority together; there is no observable
/// state with one set and not the other.
pub struct TaskOperator {
    work: WorkCell,
    priority: Mutex<TaskPriority>,
}

impl TaskOperator {
    pub fn new(work: Work, priority: TaskPriority) -> Self {
        Self {
            work: WorkCell::new(work),
            priority: Mutex::new(priority),
        }
    }

    /// Replace the deferred computation wholesale.
    pub fn set_work(&self, work: Work) {
        self.work.replace(work);
    }

    /// Whether the task currently has work installed.
    pub fn is_armed(&self) -> bool {
        self.work.is_armed()
    }
}

impl Executable for TaskOperator {
    fn execute(&self) {
        let work = self
            .work
            .take()
            .expect("execute called with no work configured");
        work();
    }
}

impl Prioritized for TaskOperator {
    fn priority(&self) -> TaskPriority {
        *self.priority.lock().unwrap()
    }

    fn set_priority(&self, priority: TaskPriority) {
        *self.priority.lock().unwrap() = priority;
    }
}
