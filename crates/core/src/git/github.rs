//! GitHub REST API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::errors::GitHubError;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A repository as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub owner: RepositoryOwner,
}

/// The owning account of a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// A pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// The pull-request operations the sync workflow needs from the hosting
/// platform. [`GitHubClient`] is the production implementation; tests
/// substitute an in-memory fake.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    /// Resolve a repository by slug. Fatal at startup when this fails.
    async fn get_repository(&self, repo: &str) -> Result<Repository, GitHubError>;

    /// List open pull requests matching a `owner:branch` head filter and a
    /// base branch.
    async fn list_open_pulls(
        &self,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, GitHubError>;

    /// Create a pull request.
    async fn create_pull(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, GitHubError>;

    /// Add assignees to the pull request's underlying issue.
    async fn add_assignees(
        &self,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), GitHubError>;

    /// Request reviews from the given users.
    async fn request_reviewers(
        &self,
        repo: &str,
        number: u64,
        reviewers: &[String],
    ) -> Result<(), GitHubError>;

    /// Post a comment on the pull request's underlying issue.
    async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), GitHubError>;

    /// Attach labels to the pull request's underlying issue.
    async fn add_labels(
        &self,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError>;

    /// Transition the pull request to the closed state.
    async fn close_pull(&self, repo: &str, number: u64) -> Result<(), GitHubError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let token = token.into();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("forksync/0.1"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("failed to build reqwest client");
        info!(api_url = %api_url, "created GitHubClient");
        Self {
            http,
            api_url,
            token,
        }
    }

    fn check_response(&self, resp: &reqwest::Response) -> Result<(), GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GitHubError::AuthenticationFailed(format!(
                "HTTP {}",
                status
            )));
        }
        if status.as_u16() == 429 {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(GitHubError::RateLimited { reset_at: reset });
        }
        Err(GitHubError::ApiError {
            status: status.as_u16(),
            body: format!("HTTP {}", status),
        })
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_repository(&self, repo: &str) -> Result<Repository, GitHubError> {
        let url = format!("{}/repos/{}", self.api_url, repo);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        self.check_response(&resp)?;
        let repository: Repository = resp.json().await?;
        debug!(full_name = %repository.full_name, owner = %repository.owner.login, "resolved repository");
        Ok(repository)
    }

    #[instrument(skip(self))]
    async fn list_open_pulls(
        &self,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequest>, GitHubError> {
        let url = format!("{}/repos/{}/pulls", self.api_url, repo);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("state", "open"),
                ("head", head),
                ("base", base),
                ("per_page", "50"),
            ])
            .send()
            .await?;
        self.check_response(&resp)?;
        let pulls: Vec<PullRequest> = resp.json().await?;
        debug!(count = pulls.len(), "listed open pull requests");
        Ok(pulls)
    }

    #[instrument(skip(self, body))]
    async fn create_pull(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/pulls", self.api_url, repo);
        let payload =
            serde_json::json!({ "title": title, "body": body, "head": head, "base": base });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        let pr: PullRequest = resp.json().await?;
        info!(number = pr.number, url = %pr.html_url, "created pull request");
        Ok(pr)
    }

    #[instrument(skip(self))]
    async fn add_assignees(
        &self,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/assignees", self.api_url, repo, number);
        let payload = serde_json::json!({ "assignees": assignees });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        debug!(number, count = assignees.len(), "added assignees");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn request_reviewers(
        &self,
        repo: &str,
        number: u64,
        reviewers: &[String],
    ) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/pulls/{}/requested_reviewers",
            self.api_url, repo, number
        );
        let payload = serde_json::json!({ "reviewers": reviewers });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        debug!(number, count = reviewers.len(), "requested reviewers");
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/comments", self.api_url, repo, number);
        let payload = serde_json::json!({ "body": body });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        debug!(number, "posted issue comment");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_labels(
        &self,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/issues/{}/labels", self.api_url, repo, number);
        let payload = serde_json::json!({ "labels": labels });
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        debug!(number, ?labels, "added labels");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn close_pull(&self, repo: &str, number: u64) -> Result<(), GitHubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, number);
        let payload = serde_json::json!({ "state": "closed" });
        let resp = self
            .http
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        self.check_response(&resp)?;
        info!(number, "closed pull request");
        Ok(())
    }
}
