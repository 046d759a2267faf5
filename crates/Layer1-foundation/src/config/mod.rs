//! Sprig configuration
//!
//! Settings load from `~/.sprig/config.toml` over built-in defaults. The
//! same directory also holds the instance store and the workspaces.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config file name, relative to the data directory
pub const SPRIG_CONFIG_FILE: &str = "config.toml";

/// Default command when a launch request does not name one
pub const DEFAULT_COMMAND: &str = "npm run dev";

/// Default retention window for terminal instances, in seconds
pub const DEFAULT_RETENTION_SECS: u64 = 60;

// ============================================================================
// Sprig Config
// ============================================================================

/// Tool-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SprigConfig {
    /// Data directory override; defaults to `~/.sprig`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// How long a terminal instance survives before `list` prunes it
    pub retention_secs: u64,

    /// Command to run when none is given on the command line
    pub default_command: String,
}

impl Default for SprigConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            retention_secs: DEFAULT_RETENTION_SECS,
            default_command: DEFAULT_COMMAND.to_string(),
        }
    }
}

impl SprigConfig {
    /// Load configuration, merging the config file (if any) over defaults
    pub fn load() -> Result<Self> {
        let data_dir = default_data_dir()?;
        let path = data_dir.join(SPRIG_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: SprigConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// Directory holding the persisted instance store
    pub fn store_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("store"))
    }

    /// Directory under which per-instance workspaces are provisioned
    pub fn workspaces_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("workspaces"))
    }

    /// Retention window as a duration
    pub fn retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retention_secs)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".sprig"))
        .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SprigConfig::default();
        assert_eq!(config.retention_secs, DEFAULT_RETENTION_SECS);
        assert_eq!(config.default_command, DEFAULT_COMMAND);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: SprigConfig = toml::from_str("retention-secs = 300\n").unwrap();
        assert_eq!(config.retention_secs, 300);
        assert_eq!(config.default_command, DEFAULT_COMMAND);
    }

    #[test]
    fn test_data_dir_override() {
        let config: SprigConfig = toml::from_str("data-dir = \"/tmp/sprig-test\"\n").unwrap();
        assert_eq!(
            config.store_dir().unwrap(),
            PathBuf::from("/tmp/sprig-test/store")
        );
        assert_eq!(
            config.workspaces_dir().unwrap(),
            PathBuf::from("/tmp/sprig-test/workspaces")
        );
    }
}
