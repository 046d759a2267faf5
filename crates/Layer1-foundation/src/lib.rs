//! # sprig-foundation
//!
//! Foundation layer for Sprig:
//! - Error: central error type shared by every layer
//! - Config: `~/.sprig/config.toml` settings and data-directory paths
//! - Storage: JsonStore (generic JSON file persistence)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{SprigConfig, SPRIG_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
