//! Git command execution.
//!
//! Every repository operation goes through the `git` CLI, treated as an
//! opaque collaborator: a non-zero exit status is a failure, and the
//! combined output is passed through verbatim as diagnostic text. The
//! runner never raises for a failing command; failure lives in the
//! result, and the caller decides what it means.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Outcome of a single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// True when the process exited with status zero.
    pub success: bool,

    /// Combined stdout and stderr, stdout first.
    pub output: String,
}

/// Capability seam over external command execution.
///
/// The sync workflow only ever runs `git`; tests substitute a scripted
/// implementation instead of a real repository.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `git` with `args` in `cwd` and wait for completion.
    async fn run_git(&self, cwd: &Path, args: &[&str]) -> CommandResult;
}

/// Production runner that shells out to the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRunner;

#[async_trait]
impl CommandRunner for GitRunner {
    async fn run_git(&self, cwd: &Path, args: &[&str]) -> CommandResult {
        let mut cmd = Command::new("git");
        cmd.current_dir(cwd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %format!("git {}", args.join(" ")), cwd = %cwd.display(), "running git command");
        let output = match cmd.output().await {
            Ok(o) => o,
            Err(e) => {
                warn!(error = %e, "failed to spawn git");
                return CommandResult {
                    success: false,
                    output: format!("failed to spawn git: {}", e),
                };
            }
        };

        let success = output.status.success();
        let combined = combine_output(&output.stdout, &output.stderr);
        if !success {
            warn!(
                exit_code = output.status.code().unwrap_or(-1),
                "git command failed"
            );
        }
        CommandResult {
            success,
            output: combined,
        }
    }
}

/// Concatenate captured stdout and stderr, stdout first, both trimmed.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    format!("{}\n{}", stdout.trim(), stderr.trim())
}
