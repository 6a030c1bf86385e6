//! Top-level fork synchronization run.
//!
//! Validates the configured strategy, resolves the platform session and
//! the fork's clone URL, then hands each configured branch to the
//! orchestrator strictly sequentially, continuing across branches
//! regardless of individual outcomes.

use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::config::{PlatformEnv, SyncConfig};
use crate::errors::SyncError;
use crate::git::github::PullRequestApi;
use crate::git::remote_url;
use crate::git::runner::CommandRunner;
use crate::sync::orchestrator::{BranchOutcome, BranchSyncOrchestrator};
use crate::sync::pr_manager::PullRequestManager;
use crate::sync::strategy::SyncStrategy;

/// The top-level sync loop.
pub struct ForkSyncDriver<'a, R: CommandRunner, P: PullRequestApi> {
    runner: &'a R,
    api: &'a P,
    config: &'a SyncConfig,
    env: &'a PlatformEnv,
}

impl<'a, R: CommandRunner, P: PullRequestApi> ForkSyncDriver<'a, R, P> {
    pub fn new(runner: &'a R, api: &'a P, config: &'a SyncConfig, env: &'a PlatformEnv) -> Self {
        Self {
            runner,
            api,
            config,
            env,
        }
    }

    /// Run one synchronization pass over all configured branches.
    ///
    /// Fatal only for an unsupported strategy or a failed repository
    /// resolution; conflicts and branch-scoped failures are normal
    /// outcomes in the returned list.
    pub async fn run(&self) -> Result<Vec<BranchOutcome>, SyncError> {
        // Validate the strategy before any side effect. The executor
        // checks it again per branch; both paths are fatal.
        let strategy = SyncStrategy::from_str(&self.config.sync_strategy)?;

        // Initial session / repository resolution is the one platform
        // call that aborts the run when it fails.
        let repository = self.api.get_repository(&self.env.repository).await?;
        let owner = repository.owner.login;

        let repo_url = self.resolve_fork_url().await;
        let branches = self.config.branches();
        info!(
            strategy = %strategy,
            repository = %repository.full_name,
            count = branches.len(),
            "starting fork sync"
        );

        let pr_manager =
            PullRequestManager::new(self.api, &self.env.repository, &owner, self.config);
        let orchestrator =
            BranchSyncOrchestrator::new(self.runner, pr_manager, self.config, repo_url);

        let mut outcomes = Vec::with_capacity(branches.len());
        for branch in &branches {
            let outcome = orchestrator.sync_branch(branch).await?;
            match &outcome {
                BranchOutcome::Completed { conflict, .. } => {
                    info!(branch = %branch, conflict = *conflict, "branch sync completed");
                }
                BranchOutcome::SetupFailed { step, .. } => {
                    warn!(branch = %branch, step = %step, "branch sync aborted during setup");
                }
            }
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Resolve the fork's clone URL.
    ///
    /// Prefers the `origin` remote of the invocation directory (the
    /// original working tree the tool is run from); falls back to a URL
    /// derived from the API base and the repository slug, so the tool
    /// also works outside a checkout.
    async fn resolve_fork_url(&self) -> String {
        let result = self
            .runner
            .run_git(Path::new("."), &["config", "--get", "remote.origin.url"])
            .await;
        if result.success {
            let url = result.output.lines().next().unwrap_or("").trim();
            if !url.is_empty() {
                debug!(url, "resolved fork clone URL from origin remote");
                return url.to_string();
            }
        }

        let derived = remote_url::derive_clone_url(&self.env.api_url, &self.env.repository);
        debug!(url = %derived, "derived fork clone URL from repository slug");
        derived
    }
}
