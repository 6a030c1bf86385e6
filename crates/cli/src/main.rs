//! ForkSync: keep a fork in sync with its upstream.
//!
//! Reads the sync settings from a YAML file (`.github/pull.yml` by
//! default), applies the configured merge strategy to each branch, and
//! surfaces every result as a pull request on the fork. Conflicts are a
//! normal outcome: the conflicted branch is pushed anyway and the pull
//! request is annotated for reviewers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use forksync_core::config::{PlatformEnv, SyncConfig};
use forksync_core::git::github::GitHubClient;
use forksync_core::git::runner::GitRunner;
use forksync_core::sync::driver::ForkSyncDriver;
use forksync_core::sync::orchestrator::BranchOutcome;
use forksync_core::sync::strategy::SyncStrategy;

/// ForkSync: strategy-driven upstream synchronization for forks.
#[derive(Parser)]
#[command(name = "forksync", version, about)]
struct Cli {
    /// Path to the sync configuration file.
    #[arg(short, long, default_value = ".github/pull.yml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one synchronization pass across the configured branches.
    Sync,

    /// Validate the configuration and environment without syncing.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync => cmd_sync(&cli.config).await,
        Commands::Check => cmd_check(&cli.config),
    }
}

/// Run one synchronization pass.
///
/// Exits non-zero only for startup failures (missing config, missing
/// token, unsupported strategy) or a failed repository resolution;
/// conflicted branches are a successfully handled outcome.
async fn cmd_sync(config_path: &str) -> Result<()> {
    let (config, env) = load(config_path)?;

    let github = GitHubClient::new(&env.api_url, &env.token);
    let runner = GitRunner;
    let driver = ForkSyncDriver::new(&runner, &github, &config, &env);

    info!(repository = %env.repository, "starting sync pass");
    let outcomes = driver.run().await.context("fork sync failed")?;

    for outcome in &outcomes {
        match outcome {
            BranchOutcome::Completed {
                branch,
                sync_branch,
                pr,
                conflict,
                ..
            } => {
                let status = if *conflict { "conflict" } else { "clean" };
                match pr {
                    Some(pr) => println!("{}: {} → {} ({})", branch, status, sync_branch, pr.url),
                    None => println!("{}: {} → {} (no pull request)", branch, status, sync_branch),
                }
            }
            BranchOutcome::SetupFailed { branch, step, .. } => {
                println!("{}: setup failed at {}", branch, step);
            }
        }
    }
    Ok(())
}

/// Validate config and environment, reporting what a sync pass would use.
fn cmd_check(config_path: &str) -> Result<()> {
    let (config, env) = load(config_path)?;

    println!("✓ Configuration OK");
    println!("  upstream:   {}", config.upstream);
    println!("  strategy:   {}", config.sync_strategy);
    println!("  branches:   {}", config.branches().join(", "));
    println!("  repository: {}", env.repository);
    println!("  api url:    {}", env.api_url);
    Ok(())
}

/// Load and validate the configuration, environment, and strategy. All
/// three are fatal startup checks.
fn load(config_path: &str) -> Result<(SyncConfig, PlatformEnv)> {
    let config =
        SyncConfig::load_and_validate(config_path).context("failed to load sync configuration")?;
    config
        .sync_strategy
        .parse::<SyncStrategy>()
        .context("invalid sync configuration")?;
    let env = PlatformEnv::from_env().context("incomplete platform environment")?;
    Ok((config, env))
}
