//! In-process transport double for lifecycle tests.
//!
//! Records start/suspend/abort calls and keeps the last `TransportEvents`
//! sink so tests can simulate progress and completion reports arriving from
//! the wire.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use fdm_core::download::{Timeouts, Transport, TransportEvents};
use fdm_core::error::TransportError;
use fdm_core::item::DownloadItem;
use url::Url;

#[derive(Default)]
pub struct MockTransport {
    starts: Mutex<Vec<Timeouts>>,
    suspends: AtomicU32,
    aborts: AtomicU32,
    events: Mutex<Option<TransportEvents>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Timeouts each `start` call was given, in call order.
    pub fn start_timeouts(&self) -> Vec<Timeouts> {
        self.starts.lock().unwrap().clone()
    }

    pub fn suspend_count(&self) -> u32 {
        self.suspends.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> u32 {
        self.aborts.load(Ordering::SeqCst)
    }

    /// The sink handed to the most recent `start`; panics if never started.
    pub fn events(&self) -> TransportEvents {
        self.events
            .lock()
            .unwrap()
            .clone()
            .expect("transport was never started")
    }

    /// Simulate the wire reporting `bytes_written` of `total_bytes`.
    pub fn report_progress(&self, bytes_written: u64, total_bytes: u64) {
        self.events().progress(bytes_written, total_bytes);
    }

    /// Simulate the transfer finishing successfully.
    pub fn report_success(&self) {
        self.events().finished(Ok(()));
    }

    /// Simulate the transfer failing with a transport error.
    pub fn report_failure(&self, error: TransportError) {
        self.events().finished(Err(error));
    }
}

impl Transport for MockTransport {
    fn start(
        &self,
        _item: &DownloadItem,
        timeouts: Timeouts,
        events: TransportEvents,
    ) -> Result<(), TransportError> {
        self.starts.lock().unwrap().push(timeouts);
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    fn suspend(&self, _url: &Url) -> Result<(), TransportError> {
        self.suspends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn abort(&self, _url: &Url) -> Result<(), TransportError> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
