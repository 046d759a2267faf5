//! Stop controller - graceful termination and bulk outcome accounting

use crate::instance::Instance;
use crate::signals::{terminate_group, SignalOutcome};
use crate::status::InstanceStatus;
use crate::store::InstanceStore;
use chrono::Utc;
use sprig_foundation::{Error, Result};

/// Per-instance outcome of a bulk stop
#[derive(Debug, Clone)]
pub enum StopOutcome {
    /// Signal path completed; the instance is now `stopping` or
    /// `exited_or_not_found`
    Signaled(InstanceStatus),

    /// Instance was not eligible, with the reason
    Skipped(String),

    /// Signaling or bookkeeping failed
    Failed(String),
}

/// One instance's entry in a bulk stop summary
#[derive(Debug, Clone)]
pub struct StopReport {
    pub id: String,
    pub name: String,
    pub outcome: StopOutcome,
}

/// Aggregate result of `stop_all`, complete before it is returned
#[derive(Debug, Clone, Default)]
pub struct StopSummary {
    pub reports: Vec<StopReport>,
}

impl StopSummary {
    pub fn signaled(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, StopOutcome::Signaled(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, StopOutcome::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, StopOutcome::Skipped(_)))
            .count()
    }
}

/// Signal an eligible instance's process group and record the transition.
///
/// The caller has already checked eligibility (`running`, pid > 0). A
/// vanished group degrades into `exited_or_not_found`; a delivered signal
/// yields `stopping`. Any other signal failure leaves the record untouched
/// so the operation can be retried.
pub(crate) async fn signal_and_record(
    store: &InstanceStore,
    mut instance: Instance,
) -> Result<Instance> {
    let now = Utc::now();
    match terminate_group(instance.pid) {
        Ok(SignalOutcome::Delivered) => {
            instance.mark_stopping(now);
            store
                .update(&instance.id, instance.clone())
                .await
                .map_err(|e| Error::persistence_for(&instance.id, "stopping", e))?;
            Ok(instance)
        }
        Ok(SignalOutcome::NoSuchProcess) => {
            instance.mark_terminal(InstanceStatus::ExitedOrNotFound, now);
            store
                .update(&instance.id, instance.clone())
                .await
                .map_err(|e| Error::persistence_for(&instance.id, "exited_or_not_found", e))?;
            Ok(instance)
        }
        Err(source) => Err(Error::SignalFailure {
            id: instance.id.clone(),
            pid: instance.pid,
            source,
        }),
    }
}
