//! Storage module for Sprig
//!
//! - `json`: JSON file persistence used by the instance store

mod json;

pub use json::JsonStore;
