//! Pull-request lifecycle for sync branches.
//!
//! Finds or creates the pull request carrying a sync branch, attaches
//! assignees and reviewers best-effort, and escalates conflicted syncs
//! with a diagnostic comment, a `conflict` label, and an optional close.

use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::errors::GitHubError;
use crate::git::github::PullRequestApi;

/// Label applied to pull requests whose sync hit a conflict.
const CONFLICT_LABEL: &str = "conflict";

/// Reference to a platform pull request, plus its head/base pair.
#[derive(Debug, Clone)]
pub struct PullRequestHandle {
    pub number: u64,
    pub url: String,
    pub head: String,
    pub base: String,
}

/// Drives pull-request side effects for one repository.
pub struct PullRequestManager<'a, P: PullRequestApi> {
    api: &'a P,
    /// The fork's `owner/repo` slug.
    repo: String,
    /// The fork owner's login, used in head filters.
    owner: String,
    config: &'a SyncConfig,
}

impl<'a, P: PullRequestApi> PullRequestManager<'a, P> {
    pub fn new(api: &'a P, repo: &str, owner: &str, config: &'a SyncConfig) -> Self {
        Self {
            api,
            repo: repo.to_string(),
            owner: owner.to_string(),
            config,
        }
    }

    /// Find the open pull request for (head, base) or create one.
    ///
    /// Reusing an existing request makes repeated runs idempotent at the
    /// pull-request level. Configured assignees and reviewers are then
    /// attached independently; a platform rejection (e.g. an invalid
    /// username) is logged as a warning and never fails the sync.
    pub async fn create_or_update(
        &self,
        head_branch: &str,
        base_branch: &str,
        strategy: &str,
    ) -> Result<PullRequestHandle, GitHubError> {
        let head_filter = format!("{}:{}", self.owner, head_branch);
        let existing = self
            .api
            .list_open_pulls(&self.repo, &head_filter, base_branch)
            .await?;

        let pr = match existing.into_iter().next() {
            Some(pr) => {
                info!(number = pr.number, url = %pr.html_url, "using existing pull request");
                pr
            }
            None => {
                let title = format!("Sync with upstream ({})", strategy);
                let body = format!(
                    "This PR syncs the `{}` branch of the fork with upstream.",
                    base_branch
                );
                let pr = self
                    .api
                    .create_pull(&self.repo, &title, &body, head_branch, base_branch)
                    .await?;
                info!(number = pr.number, url = %pr.html_url, "created pull request");
                pr
            }
        };

        if !self.config.assignees.is_empty() {
            if let Err(e) = self
                .api
                .add_assignees(&self.repo, pr.number, &self.config.assignees)
                .await
            {
                warn!(number = pr.number, error = %e, "could not add assignees");
            }
        }

        if !self.config.reviewers.is_empty() {
            if let Err(e) = self
                .api
                .request_reviewers(&self.repo, pr.number, &self.config.reviewers)
                .await
            {
                warn!(number = pr.number, error = %e, "could not request reviewers");
            }
        }

        Ok(PullRequestHandle {
            number: pr.number,
            url: pr.html_url,
            head: head_branch.to_string(),
            base: base_branch.to_string(),
        })
    }

    /// Escalate a conflicted sync on its pull request.
    ///
    /// Posts the diagnostic comment, applies the `conflict` label, and,
    /// only when `close_on_conflict` is set, closes the request. Every
    /// action is attempted even if an earlier one failed; failures are
    /// logged, never propagated.
    pub async fn escalate_conflict(&self, handle: &PullRequestHandle, details: &str) {
        let comment = conflict_comment(details);
        if let Err(e) = self
            .api
            .create_issue_comment(&self.repo, handle.number, &comment)
            .await
        {
            warn!(number = handle.number, error = %e, "failed to post conflict comment");
        }

        if let Err(e) = self
            .api
            .add_labels(&self.repo, handle.number, &[CONFLICT_LABEL.to_string()])
            .await
        {
            warn!(number = handle.number, error = %e, "failed to apply conflict label");
        }

        if self.config.close_on_conflict {
            match self.api.close_pull(&self.repo, handle.number).await {
                Ok(()) => info!(number = handle.number, "closed conflicted pull request"),
                Err(e) => {
                    warn!(number = handle.number, error = %e, "failed to close pull request")
                }
            }
        }
    }
}

/// Format the conflict comment, embedding the diagnostic verbatim in a
/// fenced block.
fn conflict_comment(details: &str) -> String {
    format!(
        "⚠️ **Conflict detected during upstream sync!**\n\n\
         The automatic merge/rebase failed due to conflicts. \
         Please resolve conflicts manually by pulling the branch, \
         fixing conflicts, and pushing.\n\n\
         ### Conflict details:\n```\n{}\n```",
        details
    )
}
