//! Per-branch synchronization workflow.
//!
//! For one branch: clone the fork into an ephemeral directory, register
//! and fetch the upstream remote, check out the sync branch per the
//! strategy's base rule, run the strategy, push the result, and drive the
//! pull-request lifecycle. Setup failures short-circuit the branch with a
//! distinct outcome; everything after a successful sync is best-effort
//! and never aborts the process.

use std::fmt;

use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::errors::SyncError;
use crate::git::github::PullRequestApi;
use crate::git::runner::CommandRunner;
use crate::sync::branch_name;
use crate::sync::pr_manager::{PullRequestHandle, PullRequestManager};
use crate::sync::strategy::{StrategyExecutor, SyncOutcome};
use crate::sync::UPSTREAM_REMOTE;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Workflow step that can fail before the strategy produces a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Clone,
    RemoteAdd,
    Fetch,
    Checkout,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "clone"),
            Self::RemoteAdd => write!(f, "remote-add"),
            Self::Fetch => write!(f, "fetch"),
            Self::Checkout => write!(f, "checkout"),
        }
    }
}

/// Result of one branch's sync attempt.
///
/// Branch-scoped problems are reported here, never as errors: the driver
/// continues with the next branch regardless.
#[derive(Debug)]
pub enum BranchOutcome {
    /// The workflow ran the strategy and reached the pull-request stage.
    Completed {
        branch: String,
        sync_branch: String,
        /// `None` when pull-request creation itself failed (logged).
        pr: Option<PullRequestHandle>,
        conflict: bool,
        pushed: bool,
    },
    /// A setup step failed; downstream steps were skipped for this branch.
    SetupFailed {
        branch: String,
        step: SetupStep,
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Composes namer -> strategy executor -> push -> pull-request manager
/// for a single branch.
pub struct BranchSyncOrchestrator<'a, R: CommandRunner, P: PullRequestApi> {
    runner: &'a R,
    pr_manager: PullRequestManager<'a, P>,
    config: &'a SyncConfig,
    /// The fork's clone URL.
    repo_url: String,
}

impl<'a, R: CommandRunner, P: PullRequestApi> BranchSyncOrchestrator<'a, R, P> {
    pub fn new(
        runner: &'a R,
        pr_manager: PullRequestManager<'a, P>,
        config: &'a SyncConfig,
        repo_url: String,
    ) -> Self {
        Self {
            runner,
            pr_manager,
            config,
            repo_url,
        }
    }

    /// Sync one branch end to end.
    ///
    /// Errors only on run-fatal conditions (an unsupported strategy);
    /// every branch-scoped failure is folded into the returned outcome.
    pub async fn sync_branch(&self, branch: &str) -> Result<BranchOutcome, SyncError> {
        let strategy = self.config.sync_strategy.as_str();
        let sync_branch = branch_name::generate(branch);
        info!(branch, sync_branch = %sync_branch, strategy, "syncing branch");

        // The working directory lives exactly as long as this attempt;
        // the TempDir guard removes it on every exit path.
        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return Ok(BranchOutcome::SetupFailed {
                    branch: branch.to_string(),
                    step: SetupStep::Clone,
                    details: format!("could not create working directory: {}", e),
                })
            }
        };
        let dir = workdir.path();

        let cloned = self
            .runner
            .run_git(dir, &["clone", &self.repo_url, "."])
            .await;
        if !cloned.success {
            return Ok(self.setup_failed(branch, SetupStep::Clone, cloned.output));
        }

        let remote_added = self
            .runner
            .run_git(dir, &["remote", "add", UPSTREAM_REMOTE, &self.config.upstream])
            .await;
        if !remote_added.success {
            return Ok(self.setup_failed(branch, SetupStep::RemoteAdd, remote_added.output));
        }

        let fetched = self.runner.run_git(dir, &["fetch", UPSTREAM_REMOTE]).await;
        if !fetched.success {
            return Ok(self.setup_failed(branch, SetupStep::Fetch, fetched.output));
        }

        let executor = StrategyExecutor::new(self.runner, dir);
        let checkout = executor
            .prepare_branch(strategy, branch, &sync_branch)
            .await?;
        if !checkout.success {
            return Ok(self.setup_failed(branch, SetupStep::Checkout, checkout.output));
        }

        let (conflict, details) = match executor.execute(strategy, branch).await {
            SyncOutcome::Clean => {
                info!(branch, "sync applied cleanly");
                (false, String::new())
            }
            SyncOutcome::Conflict { details } => {
                info!(branch, "conflict detected during sync");
                (true, details)
            }
            SyncOutcome::UnsupportedStrategy { strategy } => {
                return Err(SyncError::UnsupportedStrategy { strategy })
            }
        };

        // Push even on conflict: the partially-merged branch with its
        // conflict markers is exactly what reviewers need to resolve.
        let push = self
            .runner
            .run_git(dir, &["push", "origin", &sync_branch])
            .await;
        let pushed = push.success;
        if !pushed {
            warn!(branch, sync_branch = %sync_branch, output = %push.output, "push failed");
        }

        let pr = match self
            .pr_manager
            .create_or_update(&sync_branch, branch, strategy)
            .await
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(branch, error = %e, "pull request creation failed");
                None
            }
        };

        if conflict {
            if let Some(ref handle) = pr {
                self.pr_manager.escalate_conflict(handle, &details).await;
            }
        }

        Ok(BranchOutcome::Completed {
            branch: branch.to_string(),
            sync_branch,
            pr,
            conflict,
            pushed,
        })
    }

    fn setup_failed(&self, branch: &str, step: SetupStep, details: String) -> BranchOutcome {
        warn!(branch, step = %step, "branch setup failed, skipping remaining steps");
        BranchOutcome::SetupFailed {
            branch: branch.to_string(),
            step,
            details,
        }
    }
}
