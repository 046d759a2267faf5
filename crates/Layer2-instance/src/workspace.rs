//! Workspace provisioning
//!
//! Each instance gets an isolated, uuid-named directory under the
//! workspaces root. The instance store references workspace paths for
//! cleanup but never owns them; creation and removal happen here.

use sprig_foundation::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// An isolated working directory for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub path: PathBuf,
}

/// Provisions and removes workspace directories under one base directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base_dir: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager, ensuring the base directory exists
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir).map_err(|e| {
            Error::Config(format!(
                "failed to create workspaces directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Provision a fresh, writable workspace directory
    pub fn create(&self) -> Result<Workspace> {
        let id = Uuid::new_v4().to_string();
        let path = self.base_dir.join(&id);
        std::fs::create_dir_all(&path).map_err(|e| {
            Error::Config(format!(
                "failed to create workspace directory {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("provisioned workspace {} at {}", id, path.display());
        Ok(Workspace { id, path })
    }

    /// Recursively remove a workspace directory
    pub fn cleanup(&self, workspace: &Workspace) -> Result<()> {
        Self::cleanup_path(&workspace.path)
    }

    /// Recursively remove a workspace directory by path
    pub fn cleanup_path(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_dir_all(path).map_err(|e| {
                Error::Config(format!(
                    "failed to remove workspace directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
