//! Download operator: the per-download lifecycle state machine.
//!
//! A `FileDownloadOperator` specializes the base task operator with an item
//! handle, transport timeouts, and append-only observer registries. All
//! lifecycle changes go through pause/resume/cancel requests; each request
//! installs a new work closure for the scheduler and reports its own outcome
//! through a one-shot handler on a caller-supplied executor.

mod observers;
mod operator;
mod state;
mod transport;

pub use operator::{FileDownloadOperator, MetaCompletion, TransportEvents};
pub use state::DownloadState;
pub use transport::{Timeouts, Transport};
