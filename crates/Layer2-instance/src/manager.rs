//! Instance manager - the operations the CLI calls
//!
//! Owns the store, workspace provisioning, and supervision, and composes
//! them into `launch`, `list` (reconcile + prune), `stop`, and `stop_all`.
//! All consistency work happens inside these calls; there is no background
//! scheduler.

use crate::instance::Instance;
use crate::reconciler::{reconcile, PrunePolicy};
use crate::repo::RepoPreparer;
use crate::source::{Source, SourceOptions};
use crate::status::InstanceStatus;
use crate::stop::{signal_and_record, StopOutcome, StopReport, StopSummary};
use crate::store::InstanceStore;
use crate::supervisor::ProcessSupervisor;
use crate::workspace::WorkspaceManager;
use chrono::Utc;
use sprig_foundation::{Error, Result, SprigConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything needed to launch one instance
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    /// Source-selection flags, resolved to a concrete git reference
    pub options: SourceOptions,

    /// Local repository to clone from; defaults to the current directory.
    /// Ignored for PR sources, which carry their own repository URL.
    pub repo_path: Option<PathBuf>,

    /// Command to run; empty falls back to the configured default
    pub command: Option<String>,

    /// Port the command is expected to use; informational
    pub port: u16,

    /// Detached (background, supervised) or foreground (blocking)
    pub detached: bool,
}

/// Instance lifecycle operations over one store
pub struct InstanceManager {
    store: Arc<InstanceStore>,
    workspaces: WorkspaceManager,
    supervisor: ProcessSupervisor,
    prune: PrunePolicy,
    default_command: String,
}

impl InstanceManager {
    /// Create a manager with explicit directories and policy
    pub fn new(
        store_dir: impl Into<PathBuf>,
        workspaces_dir: impl Into<PathBuf>,
        retention: Duration,
        default_command: impl Into<String>,
    ) -> Result<Self> {
        let store = Arc::new(InstanceStore::open(store_dir)?);
        Ok(Self {
            supervisor: ProcessSupervisor::new(Arc::clone(&store)),
            store,
            workspaces: WorkspaceManager::new(workspaces_dir)?,
            prune: PrunePolicy::new(retention),
            default_command: default_command.into(),
        })
    }

    /// Create a manager from loaded configuration
    pub fn from_config(config: &SprigConfig) -> Result<Self> {
        Self::new(
            config.store_dir()?,
            config.workspaces_dir()?,
            config.retention(),
            config.default_command.clone(),
        )
    }

    pub fn store(&self) -> &Arc<InstanceStore> {
        &self.store
    }

    /// Resolve, provision, prepare, register, and start an instance.
    ///
    /// A failure anywhere before the process starts aborts the launch,
    /// removes any instance record, and cleans up the workspace. Foreground
    /// launches additionally remove record and workspace once the command
    /// finishes; the instance was never meant to outlive the call.
    pub async fn launch(&self, request: LaunchRequest) -> Result<Instance> {
        let resolved = Source::resolve(&request.options)?;

        let repo = match resolved.source.repo_url() {
            Some(url) => url.to_string(),
            None => {
                let path = request
                    .repo_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                RepoPreparer::validate_local_repo(&path)?;
                path.to_string_lossy().into_owned()
            }
        };

        let workspace = self.workspaces.create()?;

        if let Err(e) = RepoPreparer::prepare(&repo, &workspace.path, &resolved).await {
            if let Err(cleanup_err) = self.workspaces.cleanup(&workspace) {
                warn!("workspace cleanup after failed prepare: {}", cleanup_err);
            }
            return Err(e);
        }

        let command = match request.command.as_deref() {
            Some(cmd) if !cmd.is_empty() => cmd.to_string(),
            _ => self.default_command.clone(),
        };

        let instance = Instance::new(
            &workspace,
            &resolved.source.ref_name(),
            command,
            request.port,
        );

        if let Err(e) = self.store.add(instance.clone()).await {
            if let Err(cleanup_err) = self.workspaces.cleanup(&workspace) {
                warn!("workspace cleanup after failed add: {}", cleanup_err);
            }
            return Err(e);
        }

        if request.detached {
            match self.supervisor.start_detached(&instance).await {
                Ok(started) => {
                    info!(
                        "instance {} (ref: {}, pid: {}) running detached",
                        started.id,
                        resolved.source.ref_name(),
                        started.pid
                    );
                    Ok(started)
                }
                Err(e) => {
                    // Launch failure aborts creation entirely
                    if let Err(del_err) = self.store.delete(&instance.id).await {
                        warn!("failed to remove aborted instance record: {}", del_err);
                    }
                    if let Err(cleanup_err) = self.workspaces.cleanup(&workspace) {
                        warn!("workspace cleanup after failed start: {}", cleanup_err);
                    }
                    Err(e)
                }
            }
        } else {
            let result = self.supervisor.run_foreground(&instance).await;
            if let Err(del_err) = self.store.delete(&instance.id).await {
                warn!("failed to remove foreground instance record: {}", del_err);
            }
            if let Err(cleanup_err) = self.workspaces.cleanup(&workspace) {
                warn!("workspace cleanup after foreground run: {}", cleanup_err);
            }
            result
        }
    }

    /// List instances: reconcile each against OS liveness, persist
    /// corrections, prune terminal records past the retention window along
    /// with their workspaces, and return the survivors.
    pub async fn list(&self) -> Result<Vec<Instance>> {
        let now = Utc::now();
        let mut survivors = Vec::new();

        for inst in self.store.get_all().await {
            let original = inst.clone();
            let mut inst = inst;
            let changed = reconcile(&mut inst, now);

            if self.prune.should_prune(&inst, now) {
                info!(
                    "pruning instance {} (status '{}', stopped at {:?})",
                    inst.id, inst.status, inst.stop_time
                );
                if let Err(e) = self.store.delete(&inst.id).await {
                    warn!("failed to delete instance {} from store: {}", inst.id, e);
                }
                // Workspace removal is independent; a failure leaves an
                // orphaned directory, not a blocked store.
                if let Err(e) = WorkspaceManager::cleanup_path(&inst.path) {
                    warn!("orphaned workspace {}: {}", inst.path.display(), e);
                }
                continue;
            }

            if changed {
                if let Err(e) = self.store.update(&inst.id, inst.clone()).await {
                    warn!("failed to persist reconciled instance {}: {}", inst.id, e);
                    survivors.push(original);
                    continue;
                }
            }
            survivors.push(inst);
        }

        survivors.sort_by_key(|inst| inst.start_time);
        Ok(survivors)
    }

    /// Gracefully stop one running instance's process group.
    ///
    /// Only `running` instances may be stopped. A recorded pid of 0 is a
    /// dead end: the instance is marked `error_pid_zero` and a distinct
    /// error returned. A vanished group degrades to `exited_or_not_found`.
    pub async fn stop(&self, id: &str) -> Result<Instance> {
        let inst = self
            .store
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if inst.status != InstanceStatus::Running {
            return Err(Error::InvalidState {
                id: id.to_string(),
                status: inst.status.to_string(),
            });
        }

        if inst.pid == 0 {
            let mut inst = inst;
            inst.mark_terminal(InstanceStatus::ErrorPidZero, Utc::now());
            if let Err(e) = self.store.update(id, inst).await {
                warn!(
                    "additionally failed to record status 'error_pid_zero' for {}: {}",
                    id, e
                );
            }
            return Err(Error::ProcessUnavailable { id: id.to_string() });
        }

        signal_and_record(&self.store, inst).await
    }

    /// Stop every eligible instance, optionally filtered by workspace
    /// directory name (case-insensitive). Eligible instances are signaled
    /// concurrently, one task each, and all outcomes are collected before
    /// the summary is returned.
    pub async fn stop_all(&self, filter: Option<&str>) -> Result<StopSummary> {
        let mut summary = StopSummary::default();
        let mut handles = Vec::new();

        for inst in self.store.get_all().await {
            if let Some(project) = filter {
                match inst.project_name() {
                    None => {
                        summary.reports.push(StopReport {
                            id: inst.id.clone(),
                            name: inst.name.clone(),
                            outcome: StopOutcome::Skipped(
                                "missing path for project filtering".to_string(),
                            ),
                        });
                        continue;
                    }
                    Some(name) if !name.eq_ignore_ascii_case(project) => {
                        summary.reports.push(StopReport {
                            id: inst.id.clone(),
                            name: inst.name.clone(),
                            outcome: StopOutcome::Skipped("project name mismatch".to_string()),
                        });
                        continue;
                    }
                    Some(_) => {}
                }
            }

            if inst.status != InstanceStatus::Running {
                summary.reports.push(StopReport {
                    id: inst.id.clone(),
                    name: inst.name.clone(),
                    outcome: StopOutcome::Skipped(format!(
                        "status is '{}', not 'running'",
                        inst.status
                    )),
                });
                continue;
            }

            if inst.pid == 0 {
                summary.reports.push(StopReport {
                    id: inst.id.clone(),
                    name: inst.name.clone(),
                    outcome: StopOutcome::Skipped("PID is 0".to_string()),
                });
                continue;
            }

            let store = Arc::clone(&self.store);
            handles.push(tokio::spawn(async move {
                let (id, name) = (inst.id.clone(), inst.name.clone());
                match signal_and_record(&store, inst).await {
                    Ok(updated) => StopReport {
                        id,
                        name,
                        outcome: StopOutcome::Signaled(updated.status),
                    },
                    Err(e) => StopReport {
                        id,
                        name,
                        outcome: StopOutcome::Failed(e.to_string()),
                    },
                }
            }));
        }

        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(report) => summary.reports.push(report),
                Err(e) => warn!("stop task panicked: {}", e),
            }
        }

        Ok(summary)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::workspace::Workspace;
    use chrono::Duration as ChronoDuration;

    // Far beyond any configured pid_max
    const DEAD_PID: i32 = 999_999_999;

    struct Fixture {
        _dir: tempfile::TempDir,
        manager: InstanceManager,
        workspaces_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let workspaces_dir = dir.path().join("workspaces");
        let manager = InstanceManager::new(
            dir.path().join("store"),
            &workspaces_dir,
            Duration::from_secs(60),
            "npm run dev",
        )
        .unwrap();
        Fixture {
            _dir: dir,
            manager,
            workspaces_dir,
        }
    }

    async fn insert(
        fx: &Fixture,
        dir_name: &str,
        status: InstanceStatus,
        pid: i32,
    ) -> Instance {
        let path = fx.workspaces_dir.join(dir_name);
        std::fs::create_dir_all(&path).unwrap();
        let ws = Workspace {
            id: format!("ws-{dir_name}"),
            path,
        };
        let mut inst = Instance::new(&ws, "main", "sleep 30", 0);
        inst.status = status;
        inst.pid = pid;
        if status.is_terminal() || status == InstanceStatus::Stopping {
            inst.stop_time = Some(Utc::now());
        }
        fx.manager.store().add(inst.clone()).await.unwrap();
        inst
    }

    #[tokio::test]
    async fn test_list_reconciles_dead_running_instance() {
        let fx = fixture();
        let inst = insert(&fx, "w1", InstanceStatus::Running, DEAD_PID).await;

        let listed = fx.manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, InstanceStatus::ExitedUnexpectedly);
        assert!(listed[0].stop_time.is_some());

        // Persisted, not just displayed
        let stored = fx.manager.store().get(&inst.id).await.unwrap();
        assert_eq!(stored.status, InstanceStatus::ExitedUnexpectedly);
    }

    #[tokio::test]
    async fn test_list_prunes_old_terminal_instance_and_workspace() {
        let fx = fixture();
        let mut inst = insert(&fx, "w2", InstanceStatus::Stopped, 0).await;
        inst.stop_time = Some(Utc::now() - ChronoDuration::seconds(90));
        fx.manager
            .store()
            .update(&inst.id, inst.clone())
            .await
            .unwrap();

        let listed = fx.manager.list().await.unwrap();
        assert!(listed.is_empty());
        assert!(fx.manager.store().get(&inst.id).await.is_none());
        assert!(!inst.path.exists());
    }

    #[tokio::test]
    async fn test_list_keeps_fresh_terminal_instance() {
        let fx = fixture();
        let inst = insert(&fx, "w3", InstanceStatus::Stopped, 0).await;

        let listed = fx.manager.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, inst.id);
        assert!(inst.path.exists());
    }

    #[tokio::test]
    async fn test_stop_unknown_instance_is_not_found() {
        let fx = fixture();
        let err = fx.manager.stop("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stop_non_running_is_invalid_state_and_untouched() {
        let fx = fixture();
        let inst = insert(&fx, "w4", InstanceStatus::Stopped, 42).await;
        let before = fx.manager.store().get(&inst.id).await.unwrap();

        let err = fx.manager.stop(&inst.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        let after = fx.manager.store().get(&inst.id).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_stop_stopping_is_invalid_state() {
        let fx = fixture();
        let inst = insert(&fx, "w5", InstanceStatus::Stopping, 42).await;
        let before = fx.manager.store().get(&inst.id).await.unwrap();

        let err = fx.manager.stop(&inst.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));

        let after = fx.manager.store().get(&inst.id).await.unwrap();
        assert_eq!(after.stop_time, before.stop_time);
        assert_eq!(after.pid, before.pid);
    }

    #[tokio::test]
    async fn test_stop_pid_zero_marks_error_pid_zero() {
        let fx = fixture();
        let inst = insert(&fx, "w6", InstanceStatus::Running, 0).await;

        let err = fx.manager.stop(&inst.id).await.unwrap_err();
        assert!(matches!(err, Error::ProcessUnavailable { .. }));

        let stored = fx.manager.store().get(&inst.id).await.unwrap();
        assert_eq!(stored.status, InstanceStatus::ErrorPidZero);
        assert!(stored.stop_time.is_some());
    }

    #[tokio::test]
    async fn test_stop_vanished_group_is_exited_or_not_found() {
        let fx = fixture();
        let inst = insert(&fx, "w7", InstanceStatus::Running, DEAD_PID).await;

        let stopped = fx.manager.stop(&inst.id).await.unwrap();
        assert_eq!(stopped.status, InstanceStatus::ExitedOrNotFound);
    }

    #[tokio::test]
    async fn test_stop_live_group_is_stopping() {
        let fx = fixture();

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg("sleep 30").process_group(0);
        let mut child = cmd.spawn().unwrap();
        let pid = child.id().unwrap() as i32;

        let inst = insert(&fx, "w8", InstanceStatus::Running, pid).await;
        let stopped = fx.manager.stop(&inst.id).await.unwrap();
        assert_eq!(stopped.status, InstanceStatus::Stopping);

        let _ = child.wait().await;
    }

    #[tokio::test]
    async fn test_stop_all_filter_and_skip_reasons() {
        let fx = fixture();
        // Only this one matches the filter and is eligible
        let target = insert(&fx, "myproj", InstanceStatus::Running, DEAD_PID).await;
        insert(&fx, "otherproj", InstanceStatus::Running, DEAD_PID).await;
        insert(&fx, "MyProj2", InstanceStatus::Stopped, 0).await;

        let summary = fx.manager.stop_all(Some("myproj")).await.unwrap();
        assert_eq!(summary.reports.len(), 3);
        assert_eq!(summary.signaled(), 1);
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.failed(), 0);

        let stored = fx.manager.store().get(&target.id).await.unwrap();
        assert_eq!(stored.status, InstanceStatus::ExitedOrNotFound);
    }

    #[tokio::test]
    async fn test_stop_all_filter_is_case_insensitive() {
        let fx = fixture();
        insert(&fx, "MyProj", InstanceStatus::Running, DEAD_PID).await;

        let summary = fx.manager.stop_all(Some("myproj")).await.unwrap();
        assert_eq!(summary.signaled(), 1);
    }

    #[tokio::test]
    async fn test_stop_all_without_filter_skips_pid_zero() {
        let fx = fixture();
        insert(&fx, "a", InstanceStatus::Running, 0).await;
        insert(&fx, "b", InstanceStatus::Running, DEAD_PID).await;

        let summary = fx.manager.stop_all(None).await.unwrap();
        assert_eq!(summary.signaled(), 1);
        assert_eq!(summary.skipped(), 1);
        let skipped = summary
            .reports
            .iter()
            .find(|r| matches!(r.outcome, StopOutcome::Skipped(_)))
            .unwrap();
        match &skipped.outcome {
            StopOutcome::Skipped(reason) => assert!(reason.contains("PID is 0")),
            _ => unreachable!(),
        }
    }

    fn git_in(dir: &std::path::Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args([
                "-c",
                "user.name=sprig-test",
                "-c",
                "user.email=sprig@test.invalid",
            ])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    #[tokio::test]
    async fn test_launch_foreground_runs_and_cleans_up() {
        let fx = fixture();

        let repo = tempfile::tempdir().unwrap();
        git_in(repo.path(), &["init", "-b", "main"]);
        std::fs::write(repo.path().join("f.txt"), "x").unwrap();
        git_in(repo.path(), &["add", "."]);
        git_in(repo.path(), &["commit", "-m", "initial"]);

        let request = LaunchRequest {
            options: SourceOptions {
                positional: Some("main".into()),
                ..Default::default()
            },
            repo_path: Some(repo.path().to_path_buf()),
            command: Some("true".into()),
            port: 0,
            detached: false,
        };

        let finished = fx.manager.launch(request).await.unwrap();
        assert_eq!(finished.status, InstanceStatus::Stopped);
        // Foreground runs are ephemeral: record and workspace are gone
        assert!(fx.manager.store().get(&finished.id).await.is_none());
        assert!(!finished.path.exists());
    }

    #[tokio::test]
    async fn test_launch_invalid_repo_fails_before_any_record() {
        let fx = fixture();
        let bogus = tempfile::tempdir().unwrap();

        let request = LaunchRequest {
            options: SourceOptions {
                positional: Some("main".into()),
                ..Default::default()
            },
            repo_path: Some(bogus.path().to_path_buf()),
            command: Some("true".into()),
            port: 0,
            detached: true,
        };

        assert!(fx.manager.launch(request).await.is_err());
        assert!(fx.manager.store().get_all().await.is_empty());
    }
}
