//! Liveness reconciliation and pruning policy
//!
//! Recorded status is corrected against real process liveness here and only
//! here, pulled by the listing operation. There is no background timer.

use crate::instance::Instance;
use crate::signals::process_alive;
use crate::status::InstanceStatus;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Reconcile one instance's recorded status against OS liveness.
///
/// Returns `true` when the record changed and must be persisted:
/// - `running`/`stopping` with a pid whose process group vanished becomes
///   `exited_unexpectedly`/`stopped` with `stop_time` stamped now;
/// - a terminal record missing `stop_time` (legacy/incomplete) gets it
///   stamped now so pruning has a well-defined age.
pub fn reconcile(instance: &mut Instance, now: DateTime<Utc>) -> bool {
    if instance.status.is_active() && instance.pid > 0 && !process_alive(instance.pid) {
        let corrected = match instance.status {
            InstanceStatus::Running => InstanceStatus::ExitedUnexpectedly,
            _ => InstanceStatus::Stopped,
        };
        debug!(
            "instance {}: status '{}' -> '{}', pid {} not found",
            instance.id, instance.status, corrected, instance.pid
        );
        instance.mark_terminal(corrected, now);
        return true;
    }

    if instance.status.is_terminal() && instance.stop_time.is_none() {
        instance.stop_time = Some(now);
        return true;
    }

    false
}

/// Decides when terminal instances and their workspaces are old enough to die
#[derive(Debug, Clone)]
pub struct PrunePolicy {
    retention: Duration,
}

impl PrunePolicy {
    pub fn new(retention: Duration) -> Self {
        Self { retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Terminal and stopped for longer than the retention window
    pub fn should_prune(&self, instance: &Instance, now: DateTime<Utc>) -> bool {
        if !instance.status.is_terminal() {
            return false;
        }
        let Some(stop_time) = instance.stop_time else {
            return false;
        };
        let age = now.signed_duration_since(stop_time);
        match chrono::Duration::from_std(self.retention) {
            Ok(retention) => age > retention,
            Err(_) => false,
        }
    }
}

impl Default for PrunePolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            sprig_foundation::config::DEFAULT_RETENTION_SECS,
        ))
    }
}
