//! Merge strategies and their execution.
//!
//! A strategy determines how upstream changes are applied to the fork's
//! branch. Three of them (merge, rebase, squash) are ordinary git
//! operations whose only failure mode is a content conflict; hard-reset
//! replaces the fork branch with the upstream branch outright, so it has
//! no mergeable step and can never conflict.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::errors::SyncError;
use crate::git::runner::{CommandResult, CommandRunner};
use crate::sync::UPSTREAM_REMOTE;

/// Commit message for the squash strategy's follow-up commit.
const SQUASH_COMMIT_MESSAGE: &str = "Squash merge upstream changes";

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How upstream changes are applied to the fork's branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Merge `upstream/<branch>` into the fork branch.
    Merge,
    /// Rebase the fork branch onto `upstream/<branch>`.
    Rebase,
    /// Squash-merge `upstream/<branch>` and commit the result.
    Squash,
    /// Replace the fork branch with `upstream/<branch>`.
    HardReset,
}

impl SyncStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::Squash => "squash",
            Self::HardReset => "hard-reset",
        }
    }
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStrategy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Self::Merge),
            "rebase" => Ok(Self::Rebase),
            "squash" => Ok(Self::Squash),
            "hard-reset" => Ok(Self::HardReset),
            other => Err(SyncError::UnsupportedStrategy {
                strategy: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Outcome of applying a strategy to one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The strategy applied cleanly.
    Clean,
    /// A content-merging step failed; `details` carries the verbatim
    /// combined output of the failing command.
    Conflict { details: String },
    /// The strategy string is not one of the supported four. Fatal for
    /// the whole run, not just this branch.
    UnsupportedStrategy { strategy: String },
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Executes the strategy-specific git sequence inside a prepared clone.
///
/// The working directory must already contain a clone of the fork with
/// the upstream remote registered and fetched.
pub struct StrategyExecutor<'a, R: CommandRunner> {
    runner: &'a R,
    workdir: &'a Path,
}

impl<'a, R: CommandRunner> StrategyExecutor<'a, R> {
    pub fn new(runner: &'a R, workdir: &'a Path) -> Self {
        Self { runner, workdir }
    }

    /// Check out the sync branch from the strategy's base.
    ///
    /// merge/rebase/squash branch from the fork's own `origin/<branch>`;
    /// hard-reset force-checkouts directly from `upstream/<branch>`,
    /// discarding the fork's history. For that strategy the checkout
    /// itself is the whole sync.
    pub async fn prepare_branch(
        &self,
        strategy: &str,
        branch: &str,
        sync_branch: &str,
    ) -> Result<CommandResult, SyncError> {
        match strategy {
            "merge" | "rebase" | "squash" => {
                let base = format!("origin/{}", branch);
                Ok(self
                    .runner
                    .run_git(self.workdir, &["checkout", "-b", sync_branch, &base])
                    .await)
            }
            "hard-reset" => {
                let base = format!("{}/{}", UPSTREAM_REMOTE, branch);
                Ok(self
                    .runner
                    .run_git(self.workdir, &["checkout", "-B", sync_branch, &base])
                    .await)
            }
            other => Err(SyncError::UnsupportedStrategy {
                strategy: other.to_string(),
            }),
        }
    }

    /// Run the strategy's sync step(s) and classify the result.
    pub async fn execute(&self, strategy: &str, branch: &str) -> SyncOutcome {
        let upstream_ref = format!("{}/{}", UPSTREAM_REMOTE, branch);

        match strategy {
            "merge" => {
                let result = self
                    .runner
                    .run_git(self.workdir, &["merge", &upstream_ref, "--no-edit"])
                    .await;
                self.classify(branch, result)
            }
            "rebase" => {
                let result = self
                    .runner
                    .run_git(self.workdir, &["rebase", &upstream_ref])
                    .await;
                self.classify(branch, result)
            }
            "squash" => {
                let merged = self
                    .runner
                    .run_git(self.workdir, &["merge", "--squash", &upstream_ref])
                    .await;
                if !merged.success {
                    info!(branch, "squash merge step failed");
                    return SyncOutcome::Conflict {
                        details: merged.output,
                    };
                }
                let committed = self
                    .runner
                    .run_git(self.workdir, &["commit", "-m", SQUASH_COMMIT_MESSAGE])
                    .await;
                self.classify(branch, committed)
            }
            // The force-checkout in prepare_branch already synced the
            // branch; nothing left to do and no conflict is possible.
            "hard-reset" => {
                debug!(branch, "hard-reset checkout already applied");
                SyncOutcome::Clean
            }
            other => SyncOutcome::UnsupportedStrategy {
                strategy: other.to_string(),
            },
        }
    }

    fn classify(&self, branch: &str, result: CommandResult) -> SyncOutcome {
        if result.success {
            debug!(branch, "sync step completed cleanly");
            SyncOutcome::Clean
        } else {
            info!(branch, "sync step reported a conflict");
            SyncOutcome::Conflict {
                details: result.output,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted runner: commands whose joined argv starts with a scripted
    /// key fail with the scripted output; everything else succeeds.
    #[derive(Default)]
    struct ScriptedRunner {
        failures: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn failing(key: &str, output: &str) -> Self {
            let mut failures = HashMap::new();
            failures.insert(key.to_string(), output.to_string());
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run_git(&self, _cwd: &Path, args: &[&str]) -> CommandResult {
            let joined = args.join(" ");
            self.calls.lock().unwrap().push(joined.clone());
            for (key, output) in &self.failures {
                if joined.starts_with(key.as_str()) {
                    return CommandResult {
                        success: false,
                        output: output.clone(),
                    };
                }
            }
            CommandResult {
                success: true,
                output: String::new(),
            }
        }
    }

    fn executor<'a>(runner: &'a ScriptedRunner, dir: &'a Path) -> StrategyExecutor<'a, ScriptedRunner> {
        StrategyExecutor::new(runner, dir)
    }

    #[tokio::test]
    async fn test_merge_clean() {
        let runner = ScriptedRunner::default();
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("merge", "main").await;
        assert_eq!(outcome, SyncOutcome::Clean);
        assert_eq!(runner.calls(), vec!["merge upstream/main --no-edit"]);
    }

    #[tokio::test]
    async fn test_merge_conflict_carries_output() {
        let runner = ScriptedRunner::failing("merge upstream/main", "CONFLICT (content): merge conflict in src/lib.rs");
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("merge", "main").await;
        assert_eq!(
            outcome,
            SyncOutcome::Conflict {
                details: "CONFLICT (content): merge conflict in src/lib.rs".into()
            }
        );
    }

    #[tokio::test]
    async fn test_rebase_conflict() {
        let runner = ScriptedRunner::failing("rebase upstream/dev", "could not apply abc123");
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("rebase", "dev").await;
        assert!(matches!(outcome, SyncOutcome::Conflict { ref details } if details.contains("abc123")));
    }

    #[tokio::test]
    async fn test_squash_conflict_from_merge_step() {
        let runner = ScriptedRunner::failing("merge --squash upstream/main", "squash conflict");
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("squash", "main").await;
        assert_eq!(
            outcome,
            SyncOutcome::Conflict {
                details: "squash conflict".into()
            }
        );
        // The commit step is never reached.
        assert_eq!(runner.calls(), vec!["merge --squash upstream/main"]);
    }

    #[tokio::test]
    async fn test_squash_conflict_from_commit_step() {
        let runner = ScriptedRunner::failing("commit -m", "nothing to commit");
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("squash", "main").await;
        assert_eq!(
            outcome,
            SyncOutcome::Conflict {
                details: "nothing to commit".into()
            }
        );
        assert_eq!(
            runner.calls(),
            vec![
                "merge --squash upstream/main",
                "commit -m Squash merge upstream changes"
            ]
        );
    }

    #[tokio::test]
    async fn test_squash_clean() {
        let runner = ScriptedRunner::default();
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("squash", "main").await;
        assert_eq!(outcome, SyncOutcome::Clean);
    }

    #[tokio::test]
    async fn test_hard_reset_never_conflicts() {
        // Even a runner that fails every command cannot produce a
        // conflict: hard-reset has no sync step to run.
        let runner = ScriptedRunner::failing("", "everything fails");
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("hard-reset", "main").await;
        assert_eq!(outcome, SyncOutcome::Clean);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_strategy_outcome() {
        let runner = ScriptedRunner::default();
        let dir = Path::new("/tmp/work");
        let outcome = executor(&runner, dir).execute("cherry-pick", "main").await;
        assert_eq!(
            outcome,
            SyncOutcome::UnsupportedStrategy {
                strategy: "cherry-pick".into()
            }
        );
    }

    #[tokio::test]
    async fn test_prepare_branch_bases() {
        let runner = ScriptedRunner::default();
        let dir = Path::new("/tmp/work");
        let exec = executor(&runner, dir);

        exec.prepare_branch("merge", "main", "sync-upstream-main-202508071200-1a2b")
            .await
            .unwrap();
        exec.prepare_branch("hard-reset", "main", "sync-upstream-main-202508071201-3c4d")
            .await
            .unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "checkout -b sync-upstream-main-202508071200-1a2b origin/main",
                "checkout -B sync-upstream-main-202508071201-3c4d upstream/main",
            ]
        );
    }

    #[tokio::test]
    async fn test_prepare_branch_unknown_strategy_is_error() {
        let runner = ScriptedRunner::default();
        let dir = Path::new("/tmp/work");
        let result = executor(&runner, dir)
            .prepare_branch("octopus", "main", "sync-upstream-main-202508071200-1a2b")
            .await;
        assert!(matches!(
            result,
            Err(SyncError::UnsupportedStrategy { ref strategy }) if strategy == "octopus"
        ));
    }

    #[test]
    fn test_strategy_round_trip() {
        for s in ["merge", "rebase", "squash", "hard-reset"] {
            assert_eq!(s.parse::<SyncStrategy>().unwrap().as_str(), s);
        }
        assert!("octopus".parse::<SyncStrategy>().is_err());
    }
}
