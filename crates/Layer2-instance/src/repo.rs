//! Repository preparation
//!
//! Clones the requested repository into a freshly provisioned workspace and
//! checks out the resolved source, by shelling out to `git`. Any failure
//! here aborts the launch before an instance record exists.

use crate::source::{ResolvedSource, Source};
use sprig_foundation::{Error, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Clone/checkout operations for instance workspaces
pub struct RepoPreparer;

impl RepoPreparer {
    /// Check that a local path is a usable git repository
    pub fn validate_local_repo(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::InvalidInput(format!(
                "repository path does not exist: {}",
                path.display()
            )));
        }
        if !path.join(".git").exists() {
            return Err(Error::InvalidInput(format!(
                "not a git repository: {}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Populate the workspace with the checked-out source content
    pub async fn prepare(repo: &str, workspace: &Path, resolved: &ResolvedSource) -> Result<()> {
        info!(
            "preparing repository in {} for ref '{}'",
            workspace.display(),
            resolved.source.ref_name()
        );

        Self::git(None, &["clone", repo, &workspace.to_string_lossy()])
            .await
            .map_err(|e| Error::Launch(format!("initial clone failed for {repo}: {e}")))?;

        match &resolved.source {
            Source::Branch { name } | Source::Tag { name } => {
                Self::git(Some(workspace), &["checkout", name]).await?;
            }
            Source::Commit { hash } => {
                Self::git(Some(workspace), &["checkout", hash]).await?;
            }
            Source::PullRequest { number, .. } => {
                let refspec = format!("pull/{number}/head:pr-{number}");
                let local_branch = format!("pr-{number}");
                Self::git(Some(workspace), &["fetch", &resolved.remote, &refspec]).await?;
                Self::git(Some(workspace), &["checkout", &local_branch]).await?;
            }
        }

        Ok(())
    }

    /// Run one git command, failing on a non-zero exit
    async fn git(dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        debug!("running git {}", args.join(" "));
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::Launch(format!("failed to run git {}: {}", args.join(" "), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Launch(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceOptions;
    use std::process::Command as StdCommand;

    fn git_in(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
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

    fn init_repo(dir: &Path) {
        git_in(dir, &["init", "-b", "main"]);
        std::fs::write(dir.join("README.md"), "hello\n").unwrap();
        git_in(dir, &["add", "."]);
        git_in(dir, &["commit", "-m", "initial"]);
    }

    #[test]
    fn test_validate_rejects_non_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RepoPreparer::validate_local_repo(dir.path()).is_err());
        assert!(RepoPreparer::validate_local_repo(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_validate_accepts_repo() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        RepoPreparer::validate_local_repo(dir.path()).unwrap();
    }

    #[tokio::test]
    async fn test_prepare_clones_and_checks_out_branch() {
        let repo = tempfile::tempdir().unwrap();
        init_repo(repo.path());
        git_in(repo.path(), &["branch", "feature"]);

        let ws = tempfile::tempdir().unwrap();
        let workspace = ws.path().join("clone");
        std::fs::create_dir_all(&workspace).unwrap();

        let resolved = Source::resolve(&SourceOptions {
            positional: Some("feature".into()),
            ..Default::default()
        })
        .unwrap();

        RepoPreparer::prepare(&repo.path().to_string_lossy(), &workspace, &resolved)
            .await
            .unwrap();

        assert!(workspace.join("README.md").exists());
        let head = RepoPreparer::git(Some(&workspace), &["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .unwrap();
        assert_eq!(head.trim(), "feature");
    }

    #[tokio::test]
    async fn test_prepare_missing_ref_fails() {
        let repo = tempfile::tempdir().unwrap();
        init_repo(repo.path());

        let ws = tempfile::tempdir().unwrap();
        let workspace = ws.path().join("clone");
        std::fs::create_dir_all(&workspace).unwrap();

        let resolved = Source::resolve(&SourceOptions {
            positional: Some("no-such-branch".into()),
            ..Default::default()
        })
        .unwrap();

        let err = RepoPreparer::prepare(&repo.path().to_string_lossy(), &workspace, &resolved)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }
}
