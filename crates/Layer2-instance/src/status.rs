//! Instance status state machine

use serde::{Deserialize, Serialize};

/// Lifecycle states of an instance
///
/// The wire strings match the persisted store document. The enum is closed:
/// an unrecognized status in a loaded document is a decode error, never a
/// silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Record exists, process not yet started
    Created,

    /// Process group was started and is believed alive
    Running,

    /// SIGTERM was delivered; waiting for the group to exit
    Stopping,

    /// Process exited cleanly or finished shutting down
    Stopped,

    /// Recorded as running but the process group vanished
    ExitedUnexpectedly,

    /// Process exited with a non-zero or abnormal outcome
    Failed,

    /// Stop found no such process group
    ExitedOrNotFound,

    /// Start never recorded a real process id; cannot be stopped
    ErrorPidZero,
}

impl InstanceStatus {
    /// Terminal states make no further progress and are eligible for pruning
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstanceStatus::Stopped
                | InstanceStatus::ExitedUnexpectedly
                | InstanceStatus::Failed
                | InstanceStatus::ExitedOrNotFound
                | InstanceStatus::ErrorPidZero
        )
    }

    /// States whose recorded pid is probed against OS liveness
    pub fn is_active(&self) -> bool {
        matches!(self, InstanceStatus::Running | InstanceStatus::Stopping)
    }

    /// The persisted wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Created => "created",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopping => "stopping",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::ExitedUnexpectedly => "exited_unexpectedly",
            InstanceStatus::Failed => "failed",
            InstanceStatus::ExitedOrNotFound => "exited_or_not_found",
            InstanceStatus::ErrorPidZero => "error_pid_zero",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
