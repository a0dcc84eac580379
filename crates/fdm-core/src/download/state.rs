//! Download lifecycle states and terminal rules.

use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level state of one download operator.
///
/// `Idle → Running → {Paused, Cancelled, Completed, Failed}`,
/// `Paused → {Running, Cancelled}`. The last three are terminal: no
/// transition ever leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    Idle,
    Running,
    Paused,
    Cancelled,
    Completed,
    Failed,
}

impl DownloadState {
    /// Whether the state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DownloadState::Cancelled | DownloadState::Completed | DownloadState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DownloadState::Idle => "idle",
            DownloadState::Running => "running",
            DownloadState::Paused => "paused",
            DownloadState::Cancelled => "cancelled",
            DownloadState::Completed => "completed",
            DownloadState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "idle" => DownloadState::Idle,
            "running" => DownloadState::Running,
            "paused" => DownloadState::Paused,
            "cancelled" => DownloadState::Cancelled,
            "completed" => DownloadState::Completed,
            _ => DownloadState::Failed,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
