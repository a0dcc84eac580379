//! The download operator state machine.
//!
//! One mutex guards `{state, priority, timeouts, executor, work}` so a
//! transition request is never applied concurrently with another request or
//! torn against a running work closure reading those fields. Observer
//! registries are append-only and use their own lock (`observers.rs`).
//!
//! Each of pause/resume/cancel installs a fresh work closure for the
//! scheduler, updates priority and the current callback executor, and
//! reports its own outcome through a one-shot handler — distinct from the
//! persistent completion observers, which only ever report the download's
//! terminal outcome. One-shots fire strictly after the state change is
//! applied: immediately at acceptance when no transport action is pending,
//! otherwise from the installed work once the suspend/abort has run.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use super::observers::Registry;
use super::state::DownloadState;
use super::transport::{Timeouts, Transport};
use crate::config::FdmConfig;
use crate::error::{TaskError, TransportError};
use crate::executor::Executor;
use crate::item::DownloadItem;
use crate::task::{Executable, Prioritized, TaskPriority, Work};

/// One-shot handler reporting the outcome of a pause/resume action itself
/// (not the download's terminal outcome).
pub type MetaCompletion = Box<dyn FnOnce(&Url, Option<&TaskError>) + Send>;

/// Fields mutated under the operator's single mutex.
struct Ctrl {
    state: DownloadState,
    priority: TaskPriority,
    timeouts: Timeouts,
    /// Delivery target for observer and one-shot invocations until the next
    /// transition supersedes it.
    executor: Executor,
    work: Option<Work>,
    /// Whether a transfer is actually underway at the transport (a start
    /// work has executed and no suspend/abort/finish has landed since).
    transport_active: bool,
}

struct Shared {
    item: Arc<DownloadItem>,
    transport: Arc<dyn Transport>,
    ctrl: Mutex<Ctrl>,
    progress: Registry<dyn Fn(&Url, u64, u64) + Send + Sync>,
    completion: Registry<dyn Fn(&Url, Option<&Path>, Option<&TaskError>) + Send + Sync>,
    /// Set the instant a cancel request is accepted; gates progress fan-out
    /// without taking the ctrl lock on the hot path.
    cancelled: AtomicBool,
}

impl Shared {
    /// Apply the transport's terminal outcome and fan out to completion
    /// observers, in registration order, on the current executor.
    fn finish(&self, result: Result<(), TransportError>) {
        let error = result.err().map(TaskError::from);
        let (executor, state) = {
            let mut ctrl = self.ctrl.lock().unwrap();
            if ctrl.state.is_terminal() {
                // Already cancelled or finished; request-cancellation reports
                // through its one-shot handler only.
                return;
            }
            // A still-armed work generation (e.g. an unexecuted suspend)
            // stays installed; its guards observe the terminal state.
            ctrl.state = if error.is_none() {
                DownloadState::Completed
            } else {
                DownloadState::Failed
            };
            ctrl.transport_active = false;
            (Arc::clone(&ctrl.executor), ctrl.state)
        };
        tracing::info!(url = %self.item.url(), state = %state, "download finished");
        let observers = self.completion.snapshot();
        if observers.is_empty() {
            return;
        }
        let url = self.item.url().clone();
        let destination = self.item.destination().to_path_buf();
        executor.dispatch(Box::new(move || {
            let dest = error.is_none().then_some(destination.as_path());
            for observer in &observers {
                observer(&url, dest, error.as_ref());
            }
        }));
    }
}

/// Event sink the transport reports through. Captured by the operator's
/// work closures and handed to `Transport::start`; cheap to clone.
#[derive(Clone)]
pub struct TransportEvents {
    shared: Arc<Shared>,
}

impl TransportEvents {
    /// Report bytes moved. Fans out to every progress observer in
    /// registration order on the operator's current executor; one dispatch
    /// per event so per-event observer order survives concurrent executors.
    /// Suppressed once a cancel is accepted, including jobs already queued
    /// on an asynchronous executor at that point.
    pub fn progress(&self, bytes_written: u64, total_bytes: u64) {
        let shared = &self.shared;
        if shared.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let executor = {
            let ctrl = shared.ctrl.lock().unwrap();
            if ctrl.state.is_terminal() {
                return;
            }
            Arc::clone(&ctrl.executor)
        };
        let observers = shared.progress.snapshot();
        if observers.is_empty() {
            return;
        }
        let shared = Arc::clone(shared);
        executor.dispatch(Box::new(move || {
            // A cancel accepted while this job sat queued still suppresses it.
            if shared.cancelled.load(Ordering::SeqCst) {
                return;
            }
            for observer in &observers {
                observer(shared.item.url(), bytes_written, total_bytes);
            }
        }));
    }

    /// Report the transfer's terminal outcome (success or transport error).
    pub fn finished(&self, result: Result<(), TransportError>) {
        self.shared.finish(result);
    }
}

/// Priority-tagged, pausable/resumable/cancellable download task.
pub struct FileDownloadOperator {
    shared: Arc<Shared>,
}

impl FileDownloadOperator {
    /// Construct an Idle operator with default timeouts from `FdmConfig`.
    pub fn new(
        item: DownloadItem,
        priority: TaskPriority,
        executor: Executor,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_timeouts(
            item,
            priority,
            Timeouts::from(&FdmConfig::default()),
            executor,
            transport,
        )
    }

    /// Construct an Idle operator with explicit timeouts. The initial work
    /// starts the transfer when the scheduler first executes it.
    pub fn with_timeouts(
        item: DownloadItem,
        priority: TaskPriority,
        timeouts: Timeouts,
        executor: Executor,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let shared = Arc::new(Shared {
            item: Arc::new(item),
            transport,
            ctrl: Mutex::new(Ctrl {
                state: DownloadState::Idle,
                priority,
                timeouts,
                executor,
                work: None,
                transport_active: false,
            }),
            progress: Registry::new(),
            completion: Registry::new(),
            cancelled: AtomicBool::new(false),
        });
        let start = Self::start_work(&shared);
        shared.ctrl.lock().unwrap().work = Some(start);
        Self { shared }
    }

    /// The item this operator downloads. Read-only; never mutated here.
    pub fn item(&self) -> &DownloadItem {
        &self.shared.item
    }

    pub fn state(&self) -> DownloadState {
        self.shared.ctrl.lock().unwrap().state
    }

    /// Timeouts governing the next transport attempt.
    pub fn timeouts(&self) -> Timeouts {
        self.shared.ctrl.lock().unwrap().timeouts
    }

    /// Whether work is currently installed (the operator is schedulable).
    pub fn is_armed(&self) -> bool {
        self.shared.ctrl.lock().unwrap().work.is_some()
    }

    /// Append a progress observer: `(url, bytes_written, total_bytes)`.
    /// Valid in any state; never triggers an invocation by itself, and
    /// events dispatched before registration are not replayed.
    pub fn add_progress_handler(&self, handler: impl Fn(&Url, u64, u64) + Send + Sync + 'static) {
        self.shared.progress.push(Arc::new(handler));
        tracing::debug!(
            url = %self.shared.item.url(),
            observers = self.shared.progress.len(),
            "progress observer registered"
        );
    }

    /// Append a completion observer: `(url, destination_path, error)`.
    /// Same discipline as progress observers.
    pub fn add_completion_handler(
        &self,
        handler: impl Fn(&Url, Option<&Path>, Option<&TaskError>) + Send + Sync + 'static,
    ) {
        self.shared.completion.push(Arc::new(handler));
        tracing::debug!(
            url = %self.shared.item.url(),
            observers = self.shared.completion.len(),
            "completion observer registered"
        );
    }

    /// Request a pause. From Running with a transfer underway, installs work
    /// that suspends the transport; the one-shot fires once the suspend
    /// completes (a failed suspend restores Running, the best-known state).
    /// From Idle, or Running before the transfer started, there is nothing
    /// to suspend: pending start work is dropped and the one-shot fires at
    /// acceptance. Pause while Paused is an idempotent no-op success.
    pub fn pause(
        &self,
        priority: TaskPriority,
        completion: impl FnOnce(&Url, Option<&TaskError>) + Send + 'static,
        executor: Executor,
    ) {
        let shared = &self.shared;
        let mut ctrl = shared.ctrl.lock().unwrap();
        if ctrl.state.is_terminal() {
            let from = ctrl.state;
            drop(ctrl);
            tracing::warn!(url = %shared.item.url(), state = %from, "pause requested on terminal operator");
            Self::deliver_meta(
                shared.item.url().clone(),
                &executor,
                completion,
                Some(TaskError::InvalidTransition {
                    from,
                    requested: "pause",
                }),
            );
            return;
        }
        ctrl.priority = priority;
        // The superseded executor drops at function exit, after ctrl is
        // released; a WorkerExecutor joins its thread on drop.
        let _prev_executor = std::mem::replace(&mut ctrl.executor, Arc::clone(&executor));
        match (ctrl.state, ctrl.transport_active) {
            (DownloadState::Paused, _) => {
                drop(ctrl);
                tracing::debug!(url = %shared.item.url(), "pause requested while already paused");
                Self::deliver_meta(shared.item.url().clone(), &executor, completion, None);
            }
            (DownloadState::Running, true) => {
                ctrl.state = DownloadState::Paused;
                ctrl.work = Some(Self::suspend_work(shared, Box::new(completion)));
                drop(ctrl);
                tracing::info!(url = %shared.item.url(), "pausing download");
            }
            _ => {
                // Idle, or Running before the start work ever executed.
                ctrl.state = DownloadState::Paused;
                ctrl.work = None;
                drop(ctrl);
                tracing::info!(url = %shared.item.url(), "paused before transfer start");
                Self::deliver_meta(shared.item.url().clone(), &executor, completion, None);
            }
        }
    }

    /// Request a resume with new timeouts. From Idle or Paused, stores the
    /// timeouts, moves to Running, and installs work that (re)starts the
    /// transport; the one-shot fires at acceptance. Resume while Running is
    /// an idempotent no-op success and leaves timeouts untouched.
    pub fn resume(
        &self,
        priority: TaskPriority,
        request_timeout_secs: u64,
        resource_timeout_secs: u64,
        completion: impl FnOnce(&Url, Option<&TaskError>) + Send + 'static,
        executor: Executor,
    ) {
        let shared = &self.shared;
        let mut ctrl = shared.ctrl.lock().unwrap();
        if ctrl.state.is_terminal() {
            let from = ctrl.state;
            drop(ctrl);
            tracing::warn!(url = %shared.item.url(), state = %from, "resume requested on terminal operator");
            Self::deliver_meta(
                shared.item.url().clone(),
                &executor,
                completion,
                Some(TaskError::InvalidTransition {
                    from,
                    requested: "resume",
                }),
            );
            return;
        }
        ctrl.priority = priority;
        let _prev_executor = std::mem::replace(&mut ctrl.executor, Arc::clone(&executor));
        if ctrl.state == DownloadState::Running {
            drop(ctrl);
            tracing::debug!(url = %shared.item.url(), "resume requested while already running");
            Self::deliver_meta(shared.item.url().clone(), &executor, completion, None);
            return;
        }
        ctrl.timeouts = Timeouts::new(request_timeout_secs, resource_timeout_secs);
        ctrl.state = DownloadState::Running;
        ctrl.work = Some(Self::start_work(shared));
        drop(ctrl);
        tracing::info!(
            url = %shared.item.url(),
            request_timeout_secs,
            resource_timeout_secs,
            "resuming download"
        );
        Self::deliver_meta(shared.item.url().clone(), &executor, completion, None);
    }

    /// Request a cancel (terminal). The suppression gate is set at
    /// acceptance, so no progress observer fires afterwards. If a transfer
    /// is underway, the installed work aborts the transport and pending disk
    /// writes before the one-shot fires; otherwise the one-shot fires at
    /// acceptance. Cancellation-by-request is not an error, so the one-shot
    /// takes only the url; completion observers do not fire for it.
    pub fn cancel(
        &self,
        priority: TaskPriority,
        completion: impl FnOnce(&Url) + Send + 'static,
        executor: Executor,
    ) {
        let shared = &self.shared;
        let mut ctrl = shared.ctrl.lock().unwrap();
        if ctrl.state.is_terminal() {
            let from = ctrl.state;
            drop(ctrl);
            // The cancel one-shot has no error slot; invoke it anyway and
            // leave terminal state untouched. Cancelling a Cancelled
            // operator is idempotent, anything else is caller misuse.
            if from == DownloadState::Cancelled {
                tracing::debug!(url = %shared.item.url(), "cancel requested while already cancelled");
            } else {
                tracing::warn!(url = %shared.item.url(), state = %from, "cancel requested on terminal operator");
            }
            let url = shared.item.url().clone();
            executor.dispatch(Box::new(move || completion(&url)));
            return;
        }
        ctrl.priority = priority;
        let _prev_executor = std::mem::replace(&mut ctrl.executor, Arc::clone(&executor));
        ctrl.state = DownloadState::Cancelled;
        shared.cancelled.store(true, Ordering::SeqCst);
        let transport_active = ctrl.transport_active;
        if transport_active {
            ctrl.work = Some(Self::abort_work(shared, Box::new(completion)));
            drop(ctrl);
            tracing::info!(url = %shared.item.url(), "cancelling download");
        } else {
            ctrl.work = None;
            drop(ctrl);
            tracing::info!(url = %shared.item.url(), "cancelled before transfer start");
            let url = shared.item.url().clone();
            executor.dispatch(Box::new(move || completion(&url)));
        }
    }

    /// Work that starts (or restarts) the transfer with the timeouts current
    /// at execution time.
    fn start_work(shared: &Arc<Shared>) -> Work {
        let shared = Arc::clone(shared);
        Box::new(move || {
            let timeouts = {
                let mut ctrl = shared.ctrl.lock().unwrap();
                if ctrl.state.is_terminal() {
                    return;
                }
                ctrl.state = DownloadState::Running;
                ctrl.transport_active = true;
                ctrl.timeouts
            };
            tracing::debug!(url = %shared.item.url(), ?timeouts, "starting transport");
            let events = TransportEvents {
                shared: Arc::clone(&shared),
            };
            if let Err(e) = shared.transport.start(&shared.item, timeouts, events) {
                shared.finish(Err(e));
            }
        })
    }

    /// Work that suspends the transfer and then reports the pause outcome.
    fn suspend_work(shared: &Arc<Shared>, completion: MetaCompletion) -> Work {
        let shared = Arc::clone(shared);
        Box::new(move || {
            let result = shared.transport.suspend(shared.item.url());
            let (executor, error) = {
                let mut ctrl = shared.ctrl.lock().unwrap();
                match result {
                    Ok(()) => {
                        ctrl.transport_active = false;
                        (Arc::clone(&ctrl.executor), None)
                    }
                    Err(e) => {
                        // The transfer is still running; reflect the
                        // best-known actual state, not the requested one.
                        if ctrl.state == DownloadState::Paused {
                            ctrl.state = DownloadState::Running;
                        }
                        tracing::warn!(url = %shared.item.url(), error = %e, "transport suspend failed");
                        (Arc::clone(&ctrl.executor), Some(TaskError::Transport(e)))
                    }
                }
            };
            let url = shared.item.url().clone();
            executor.dispatch(Box::new(move || completion(&url, error.as_ref())));
        })
    }

    /// Work that aborts the transfer and then reports the cancel outcome.
    fn abort_work(shared: &Arc<Shared>, completion: Box<dyn FnOnce(&Url) + Send>) -> Work {
        let shared = Arc::clone(shared);
        Box::new(move || {
            if let Err(e) = shared.transport.abort(shared.item.url()) {
                // Cancellation already took effect; the state stays terminal.
                tracing::error!(url = %shared.item.url(), error = %e, "transport abort failed");
            }
            let executor = {
                let mut ctrl = shared.ctrl.lock().unwrap();
                ctrl.transport_active = false;
                Arc::clone(&ctrl.executor)
            };
            let url = shared.item.url().clone();
            executor.dispatch(Box::new(move || completion(&url)));
        })
    }

    fn deliver_meta(
        url: Url,
        executor: &Executor,
        completion: impl FnOnce(&Url, Option<&TaskError>) + Send + 'static,
        error: Option<TaskError>,
    ) {
        executor.dispatch(Box::new(move || completion(&url, error.as_ref())));
    }
}

impl Executable for FileDownloadOperator {
    fn execute(&self) {
        let work = self
            .shared
            .ctrl
            .lock()
            .unwrap()
            .work
            .take()
            .expect("execute called with no work configured");
        work();
    }
}

impl Prioritized for FileDownloadOperator {
    fn priority(&self) -> TaskPriority {
        self.shared.ctrl.lock().unwrap().priority
    }

    fn set_priority(&self, priority: TaskPriority) {
        self.shared.ctrl.lock().unwrap().priority = priority;
    }
}
