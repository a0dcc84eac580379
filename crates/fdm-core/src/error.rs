//! Error taxonomy for download operators.
//!
//! `TransportError` covers failures from the underlying transfer (timeouts,
//! connection drops, HTTP errors, disk writes). `TaskError` is what reaches
//! completion handlers: either a transport failure or a transition requested
//! against an incompatible state. `execute()` on an operator with no work
//! installed is a scheduler programming error and panics instead (see
//! `task::Executable`).

use thiserror::Error;

use crate::download::DownloadState;

/// Failure reported by the underlying transport for one transfer attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The per-request or whole-resource timeout elapsed.
    #[error("timed out after {0}s")]
    Timeout(u64),
    /// Connection-level failure (DNS, refused, reset).
    #[error("connection failed: {0}")]
    Connection(String),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u16),
    /// Disk write for the destination file failed. Not retried.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
}

/// Error delivered through a completion handler's error parameter.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The transport could not perform or finish the requested action.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A transition was requested on a terminal or otherwise incompatible state.
    #[error("invalid transition: cannot {requested} from {from}")]
    InvalidTransition {
        from: DownloadState,
        requested: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_both_states() {
        let err = TaskError::InvalidTransition {
            from: DownloadState::Cancelled,
            requested: "pause",
        };
        let msg = err.to_string();
        assert!(msg.contains("pause"), "{msg}");
        assert!(msg.contains("cancelled"), "{msg}");
    }

    #[test]
    fn transport_error_wraps_into_task_error() {
        let err: TaskError = TransportError::Http(503).into();
        assert_eq!(err.to_string(), "HTTP 503");
    }
}
