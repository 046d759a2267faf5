//! Error types for Sprig
//!
//! Every layer reports failures through this one enum so the CLI can
//! name the instance, the attempted transition, and the cause.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Sprig error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Store
    // ========================================================================
    #[error("no instance found with ID '{0}'")]
    NotFound(String),

    #[error("instance with ID '{0}' already exists")]
    AlreadyExists(String),

    #[error("instance store error: {0}")]
    Persistence(String),

    // ========================================================================
    // Lifecycle
    // ========================================================================
    #[error("instance '{id}' is not in a 'running' state (current status: {status})")]
    InvalidState { id: String, status: String },

    #[error("instance '{id}' has PID 0 recorded, cannot stop; status updated to 'error_pid_zero'")]
    ProcessUnavailable { id: String },

    #[error("failed to send SIGTERM to process group {pid} for instance '{id}': {source}")]
    SignalFailure {
        id: String,
        pid: i32,
        source: std::io::Error,
    },

    // ========================================================================
    // Launch
    // ========================================================================
    #[error("failed to launch instance: {0}")]
    Launch(String),

    #[error("process for instance '{id}' exited with code {code}")]
    ProcessExit { id: String, code: i32 },

    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the same operation can succeed without operator
    /// intervention. Signal failures other than ESRCH leave the instance
    /// untouched, so they are the retryable class.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SignalFailure { .. } | Error::Persistence(_))
    }

    /// Persistence error that names the transition that was being recorded
    pub fn persistence_for(id: &str, attempted_status: &str, cause: impl std::fmt::Display) -> Self {
        Error::Persistence(format!(
            "failed to record status '{attempted_status}' for instance '{id}': {cause}"
        ))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}
