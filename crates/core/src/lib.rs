//! ForkSync core library.
//!
//! This crate provides the components for keeping a forked repository in
//! sync with its upstream: configuration, the git command runner, the
//! GitHub API client, merge strategies, and the per-branch sync workflow
//! that surfaces results as pull requests.

pub mod config;
pub mod errors;
pub mod git;
pub mod sync;

// Re-exports for convenience.
pub use config::{PlatformEnv, SyncConfig};
pub use errors::CoreError;
pub use git::github::GitHubClient;
pub use git::runner::{CommandResult, CommandRunner, GitRunner};
pub use sync::driver::ForkSyncDriver;
pub use sync::orchestrator::BranchOutcome;
pub use sync::strategy::{SyncOutcome, SyncStrategy};
