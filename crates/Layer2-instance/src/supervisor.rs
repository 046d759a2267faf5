//! Process supervisor - launches instance commands and reaps their exits
//!
//! Detached launches put the command at the head of a fresh process group so
//! later control (stop, liveness probes) addresses the whole group, and
//! redirect stdout/stderr to per-instance log files in the workspace. A
//! spawned reaper waits on the child so it never lingers as a zombie while
//! the launching process is alive, and records the terminal status through
//! the store's write path.

use crate::instance::Instance;
use crate::status::InstanceStatus;
use crate::store::InstanceStore;
use chrono::Utc;
use sprig_foundation::{Error, Result};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Supervises instance processes against one store
pub struct ProcessSupervisor {
    store: Arc<InstanceStore>,
}

impl ProcessSupervisor {
    pub fn new(store: Arc<InstanceStore>) -> Self {
        Self { store }
    }

    /// Start the instance's command detached, as a new process-group leader.
    ///
    /// On success the stored record carries the leader pid and `running`
    /// status, and a reaper task waits on the child to record `stopped` or
    /// `failed`. The reaper dies with the launching process; a later `list`
    /// reconciles whatever it missed.
    pub async fn start_detached(&self, instance: &Instance) -> Result<Instance> {
        let mut inst = self
            .store
            .get(&instance.id)
            .await
            .ok_or_else(|| Error::NotFound(instance.id.clone()))?;

        let stdout = std::fs::File::create(inst.stdout_log_path()).map_err(|e| {
            Error::Launch(format!(
                "failed to create stdout log file {}: {}",
                inst.stdout_log_path().display(),
                e
            ))
        })?;
        let stderr = std::fs::File::create(inst.stderr_log_path()).map_err(|e| {
            Error::Launch(format!(
                "failed to create stderr log file {}: {}",
                inst.stderr_log_path().display(),
                e
            ))
        })?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&inst.command)
            .current_dir(&inst.path)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(false);

        // New process group so the whole command tree is signalable as a unit
        #[cfg(unix)]
        cmd.process_group(0);

        debug!("starting detached instance {}: {}", inst.id, inst.command);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Launch(format!("failed to start process: {e}")))?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Launch("failed to get process id".to_string()))?
            as i32;

        inst.mark_running(pid);
        self.store
            .update(&inst.id, inst.clone())
            .await
            .map_err(|e| Error::persistence_for(&inst.id, "running", e))?;

        let store = Arc::clone(&self.store);
        let id = inst.id.clone();
        tokio::spawn(async move {
            let outcome = child.wait().await;
            let clean = matches!(&outcome, Ok(status) if status.success());
            let status = if clean {
                InstanceStatus::Stopped
            } else {
                InstanceStatus::Failed
            };

            match &outcome {
                Ok(exit) => debug!("instance {} exited: {:?}", id, exit.code()),
                Err(e) => warn!("instance {} wait failed: {}", id, e),
            }

            if let Some(mut current) = store.get(&id).await {
                current.mark_terminal(status, Utc::now());
                if let Err(e) = store.update(&id, current).await {
                    warn!(
                        "failed to record status '{}' for instance {}: {}",
                        status, id, e
                    );
                }
            }
        });

        Ok(inst)
    }

    /// Run the instance's command synchronously, streaming to the terminal.
    ///
    /// Blocks the caller until the command exits. The record transitions to
    /// `running` (with the real pid) before launch and to `stopped` after
    /// exit; a non-zero exit is reported as `ProcessExit`, distinct from a
    /// spawn failure.
    pub async fn run_foreground(&self, instance: &Instance) -> Result<Instance> {
        let mut inst = self
            .store
            .get(&instance.id)
            .await
            .ok_or_else(|| Error::NotFound(instance.id.clone()))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&inst.command).current_dir(&inst.path);

        debug!("running instance {} in foreground: {}", inst.id, inst.command);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                inst.mark_terminal(InstanceStatus::Failed, Utc::now());
                if let Err(update_err) = self.store.update(&inst.id, inst.clone()).await {
                    warn!(
                        "failed to record status 'failed' for instance {}: {}",
                        inst.id, update_err
                    );
                }
                return Err(Error::Launch(format!("failed to start process: {e}")));
            }
        };

        if let Some(pid) = child.id() {
            inst.mark_running(pid as i32);
            self.store
                .update(&inst.id, inst.clone())
                .await
                .map_err(|e| Error::persistence_for(&inst.id, "running", e))?;
        }

        let exit = child
            .wait()
            .await
            .map_err(|e| Error::Launch(format!("failed to wait for process: {e}")))?;

        inst.mark_terminal(InstanceStatus::Stopped, Utc::now());
        self.store
            .update(&inst.id, inst.clone())
            .await
            .map_err(|e| Error::persistence_for(&inst.id, "stopped", e))?;

        if !exit.success() {
            return Err(Error::ProcessExit {
                id: inst.id,
                code: exit.code().unwrap_or(-1),
            });
        }

        Ok(inst)
    }
}
