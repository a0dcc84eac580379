//! Callback delivery contexts.
//!
//! Every transition request carries the executor on which the operator's
//! subsequent handler invocations run, so callers choose per transition
//! where callbacks land (caller thread, a dedicated worker, or an async
//! runtime). The operator stores the most recently supplied executor and
//! uses it for all observers until the next transition supersedes it.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

/// A unit of callback work handed to an executor.
pub type CallbackJob = Box<dyn FnOnce() + Send>;

/// Execution context for handler invocations.
pub trait CallbackExecutor: Send + Sync {
    /// Run `job`. Ordering between two jobs dispatched to the same executor
    /// must match dispatch order (all stock implementations guarantee this).
    fn dispatch(&self, job: CallbackJob);
}

/// Shared handle to an executor, cloned into each transition.
pub type Executor = Arc<dyn CallbackExecutor>;

/// Runs callbacks synchronously on the dispatching thread.
///
/// Useful for tests and for callers that already are on the thread they
/// want callbacks on. Do not hold the operator's own methods' locks inside
/// callbacks dispatched inline; the operator never dispatches while locked.
#[derive(Debug, Default)]
pub struct InlineExecutor;

impl CallbackExecutor for InlineExecutor {
    fn dispatch(&self, job: CallbackJob) {
        job();
    }
}

/// Runs callbacks on one dedicated worker thread, in dispatch order.
pub struct WorkerExecutor {
    tx: Option<mpsc::Sender<CallbackJob>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerExecutor {
    /// Spawn the worker thread. Jobs dispatched after drop are discarded.
    pub fn spawn(name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<CallbackJob>();
        let worker = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .ok();
        if worker.is_none() {
            tracing::warn!("failed to spawn callback worker {name}; jobs will be dropped");
        }
        Self {
            tx: Some(tx),
            worker,
        }
    }
}

impl CallbackExecutor for WorkerExecutor {
    fn dispatch(&self, job: CallbackJob) {
        if let Some(tx) = &self.tx {
            // Send fails only once the worker is gone; nothing to deliver to then.
            let _ = tx.send(job);
        }
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        // Close the channel so the worker drains remaining jobs and exits.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Runs callbacks as tasks on a tokio runtime.
impl CallbackExecutor for tokio::runtime::Handle {
    fn dispatch(&self, job: CallbackJob) {
        let _ = self.spawn(async move { job() });
    }
}
