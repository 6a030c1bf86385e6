//! Git and GitHub collaborators: the CLI command runner, clone-URL
//! derivation, and the REST API client.

pub mod github;
pub mod remote_url;
pub mod runner;

pub use github::GitHubClient;
pub use runner::{CommandResult, CommandRunner, GitRunner};
