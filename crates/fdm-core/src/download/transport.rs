//! Transport seam: the interface the operator's work closures drive.
//!
//! The operator never talks HTTP or touches disk itself; it asks a
//! `Transport` to start, suspend, or abort a transfer and receives
//! progress/completion reports back through the `TransportEvents` sink its
//! work closure captured. Range support and resume-from-offset are the
//! transport's concern.

use url::Url;

use super::operator::TransportEvents;
use crate::config::FdmConfig;
use crate::error::TransportError;
use crate::item::DownloadItem;

/// Timeouts governing the next transport attempt, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per-request timeout (connect + each read stall).
    pub request_secs: u64,
    /// Whole-resource timeout for the complete transfer.
    pub resource_secs: u64,
}

impl Timeouts {
    pub fn new(request_secs: u64, resource_secs: u64) -> Self {
        Self {
            request_secs,
            resource_secs,
        }
    }
}

impl From<&FdmConfig> for Timeouts {
    fn from(cfg: &FdmConfig) -> Self {
        Self {
            request_secs: cfg.default_request_timeout_secs,
            resource_secs: cfg.default_resource_timeout_secs,
        }
    }
}

/// The byte-moving collaborator behind a download operator.
///
/// Implementations report progress and the terminal outcome exclusively
/// through the `events` sink handed to `start`; they must not reach
/// observers directly. All three calls are invoked from the operator's
/// installed work, i.e. on whatever context the scheduler executes on.
pub trait Transport: Send + Sync {
    /// Start (or restart after a pause) the transfer for `item` with the
    /// given timeouts. Returns once the transfer is underway; bytes then
    /// flow in the background and land as events.
    fn start(
        &self,
        item: &DownloadItem,
        timeouts: Timeouts,
        events: TransportEvents,
    ) -> Result<(), TransportError>;

    /// Suspend the in-flight transfer, keeping enough state to resume.
    fn suspend(&self, url: &Url) -> Result<(), TransportError>;

    /// Abort the transfer and discard any pending disk writes.
    fn abort(&self, url: &Url) -> Result<(), TransportError>;
}
