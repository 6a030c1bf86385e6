//! YAML configuration for ForkSync.
//!
//! Sync settings live in a YAML document, `.github/pull.yml` by default.
//! Secrets are never stored there: the GitHub token, API base URL, and
//! repository slug come from the process environment and are resolved at
//! startup via [`PlatformEnv::from_env`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

/// Environment variable holding the GitHub access token.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable overriding the GitHub API base URL.
pub const API_URL_VAR: &str = "GITHUB_API";

/// Environment variable naming the fork in `owner/repo` format.
pub const REPOSITORY_VAR: &str = "GITHUB_REPOSITORY";

// ---------------------------------------------------------------------------
// Sync configuration
// ---------------------------------------------------------------------------

/// Sync configuration loaded from the YAML file.
///
/// Immutable for the duration of a run; owned by the driver and passed by
/// reference to everything that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upstream repository URL the fork tracks.
    pub upstream: String,

    /// Branch synced when `branches_to_sync` is empty. Default `main`.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Ordered list of branches to sync. Empty falls back to
    /// `[default_branch]`.
    #[serde(default)]
    pub branches_to_sync: Vec<String>,

    /// One of `merge`, `rebase`, `squash`, `hard-reset`. Default `merge`.
    #[serde(default = "default_strategy")]
    pub sync_strategy: String,

    /// GitHub usernames assigned to each sync pull request.
    #[serde(default)]
    pub assignees: Vec<String>,

    /// GitHub usernames requested for review on each sync pull request.
    #[serde(default)]
    pub reviewers: Vec<String>,

    /// Close the pull request automatically when the sync conflicts.
    #[serde(default)]
    pub close_on_conflict: bool,
}

fn default_branch() -> String {
    "main".into()
}
fn default_strategy() -> String {
    "merge".into()
}

impl SyncConfig {
    /// Load a [`SyncConfig`] from a YAML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading sync configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("sync configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "upstream".into(),
                detail: "upstream repository URL must not be empty".into(),
            });
        }
        if self.default_branch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_branch".into(),
                detail: "default branch must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the list of branches to sync: the explicit list when
    /// present, otherwise just the default branch.
    pub fn branches(&self) -> Vec<String> {
        if self.branches_to_sync.is_empty() {
            vec![self.default_branch.clone()]
        } else {
            self.branches_to_sync.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Platform environment
// ---------------------------------------------------------------------------

/// Platform session settings resolved from the process environment.
#[derive(Debug, Clone)]
pub struct PlatformEnv {
    /// GitHub access token.
    pub token: String,

    /// GitHub API base URL.
    pub api_url: String,

    /// The fork's `owner/repo` slug on the hosting platform.
    pub repository: String,
}

impl PlatformEnv {
    /// Resolve the platform environment.
    ///
    /// The token and repository slug are required; their absence is a
    /// fatal startup error. The API URL falls back to the public endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = require_env(TOKEN_VAR)?;
        let repository = require_env(REPOSITORY_VAR)?;
        let api_url = std::env::var(API_URL_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://api.github.com".to_string());

        debug!(api_url = %api_url, repository = %repository, "resolved platform environment");
        Ok(Self {
            token,
            api_url,
            repository,
        })
    }
}

fn require_env(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ConfigError::EnvVarMissing { var: var.into() }),
    }
}
