//! The synchronization engine: branch naming, merge strategies, the
//! per-branch workflow, pull-request lifecycle, and the top-level driver.

pub mod branch_name;
pub mod driver;
pub mod orchestrator;
pub mod pr_manager;
pub mod strategy;

/// Name under which the upstream remote is registered in each clone.
pub const UPSTREAM_REMOTE: &str = "upstream";

pub use driver::ForkSyncDriver;
pub use orchestrator::{BranchOutcome, BranchSyncOrchestrator, SetupStep};
pub use pr_manager::{PullRequestHandle, PullRequestManager};
pub use strategy::{StrategyExecutor, SyncOutcome, SyncStrategy};
