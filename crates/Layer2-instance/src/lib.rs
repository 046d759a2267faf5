//! # sprig-instance
//!
//! Instance lifecycle and process supervision engine:
//! - `Instance` / `InstanceStatus`: the managed entity and its state machine
//! - `InstanceStore`: durable keyed collection with write-through persistence
//! - `ProcessSupervisor`: detached process-group launch and reaping
//! - reconciler: lazy liveness reconciliation and pruning policy
//! - stop: graceful single and bulk termination
//! - `InstanceManager`: the operations exposed to the CLI
//!
//! Collaborators with no state machine of their own live here too:
//! workspace provisioning, source resolution, repository preparation.

pub mod instance;
pub mod manager;
pub mod reconciler;
pub mod repo;
pub mod signals;
pub mod source;
pub mod status;
pub mod stop;
pub mod store;
pub mod supervisor;
pub mod workspace;

pub use instance::Instance;
pub use manager::{InstanceManager, LaunchRequest};
pub use reconciler::{reconcile, PrunePolicy};
pub use repo::RepoPreparer;
pub use source::{Source, SourceOptions};
pub use status::InstanceStatus;
pub use stop::{StopOutcome, StopReport, StopSummary};
pub use store::InstanceStore;
pub use supervisor::ProcessSupervisor;
pub use workspace::{Workspace, WorkspaceManager};
