//! Instance definition

use crate::status::InstanceStatus;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One managed, loggable execution of a command inside an isolated workspace
///
/// Serialized camelCase into the store document. `pid` 0 means the instance
/// never successfully started; `stop_time` is set exactly when the instance
/// leaves the `created`/`running` states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Unique identifier, assigned at creation
    pub id: String,

    /// Human-readable label, derived from the source ref and the id prefix
    pub name: String,

    /// Process-group id of the leader process; 0 = never started
    pub pid: i32,

    /// Network port the command is expected to use; informational only
    pub port: u16,

    /// Workspace directory holding the checked-out content
    pub path: PathBuf,

    /// Current lifecycle state
    pub status: InstanceStatus,

    /// Shell command the instance runs
    pub command: String,

    /// Id of the provisioned workspace
    pub workspace_id: String,

    /// When the record was created
    pub start_time: DateTime<Utc>,

    /// When the instance entered a stop-leaning state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,

    /// Captured stdout log file
    pub log_path: PathBuf,
}

impl Instance {
    /// Create a new `created` instance bound to a workspace
    pub fn new(workspace: &Workspace, ref_name: &str, command: impl Into<String>, port: u16) -> Self {
        let id = Uuid::new_v4().to_string();
        let name = format!("{}-{}", ref_name, &id[..8]);
        let log_path = workspace.path.join(format!("{id}.out.log"));

        Self {
            id,
            name,
            pid: 0,
            port,
            path: workspace.path.clone(),
            status: InstanceStatus::Created,
            command: command.into(),
            workspace_id: workspace.id.clone(),
            start_time: Utc::now(),
            stop_time: None,
            log_path,
        }
    }

    /// Stdout log file for this instance's workspace
    pub fn stdout_log_path(&self) -> PathBuf {
        self.path.join(format!("{}.out.log", self.id))
    }

    /// Stderr log file for this instance's workspace
    pub fn stderr_log_path(&self) -> PathBuf {
        self.path.join(format!("{}.err.log", self.id))
    }

    /// Directory name the stop-all project filter matches against
    pub fn project_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Record a successful start
    pub fn mark_running(&mut self, pid: i32) {
        self.pid = pid;
        self.status = InstanceStatus::Running;
    }

    /// Record a delivered termination signal
    pub fn mark_stopping(&mut self, now: DateTime<Utc>) {
        self.status = InstanceStatus::Stopping;
        self.stop_time = Some(now);
    }

    /// Record a terminal state
    pub fn mark_terminal(&mut self, status: InstanceStatus, now: DateTime<Utc>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.stop_time = Some(now);
    }

    /// Whether this instance lives under the given workspaces root
    pub fn is_under(&self, base: &Path) -> bool {
        self.path.starts_with(base)
    }
}

impl std::fmt::Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}
