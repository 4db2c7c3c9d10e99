//! CLI command definitions for activity-sync.
//!
//! Configuration comes from flags with environment-variable fallbacks, so
//! the same binary runs under a process manager (`serve`) or from cron
//! (`sync`).

use std::sync::Arc;

use clap::{Args, Parser};
use tracing::info;

use crate::github::{GitHubApi, HttpGitHubClient, CORE_RESOURCE, GITHUB_API_BASE};
use crate::metrics::init_metrics;
use crate::server::{self, AppState};
use crate::storage::Database;
use crate::sync::{
    SyncMode, SyncPipeline, SyncSettings, DEFAULT_ENRICH_PAGES, DEFAULT_MAX_PAGES,
    DEFAULT_PAGE_SIZE, DEFAULT_QUOTA_FLOOR,
};

/// Default SQLite database location.
const DEFAULT_DATABASE_URL: &str = "sqlite://activity.db";

/// Mirror a GitHub user's activity feed into a local store and serve it.
#[derive(Parser)]
#[command(name = "activity-sync")]
#[command(about = "Mirror a GitHub user's activity feed into a local store and serve it")]
#[command(version)]
#[command(
    long_about = "activity-sync fetches a user's GitHub events, enriches pull requests and pushes, \
and stores them in SQLite. The HTTP server exposes filtered views and a protected sync trigger.\n\n\
Example usage:\n  GITHUB_TOKEN=... GITHUB_USERNAME=octocat SYNC_SECRET=... activity-sync serve --port 3000\n  \
activity-sync sync --full --json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the HTTP server.
    Serve(ServeArgs),

    /// Run one sync and exit.
    Sync(SyncArgs),

    /// Show the stored rate-limit snapshot and last sync outcome.
    Status(StatusArgs),
}

/// Settings shared by every command that talks to GitHub.
#[derive(Args, Debug, Clone)]
pub struct GitHubArgs {
    /// SQLite database URL.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// GitHub token used for every upstream request.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// User whose activity feed is mirrored.
    #[arg(long, env = "GITHUB_USERNAME")]
    pub github_username: Option<String>,

    /// GitHub API root (GitHub Enterprise: https://host/api/v3).
    #[arg(long, env = "GITHUB_API_BASE", default_value = GITHUB_API_BASE)]
    pub api_base: String,

    /// Maximum event pages fetched per run.
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    /// Events per page (1-100).
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Number of leading pages that get network enrichment.
    #[arg(long, default_value_t = DEFAULT_ENRICH_PAGES)]
    pub enrich_pages: usize,

    /// Refuse to start, or stop paginating, at or below this many remaining requests.
    #[arg(long, default_value_t = DEFAULT_QUOTA_FLOOR)]
    pub quota_floor: u32,
}

impl GitHubArgs {
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            page_size: self.page_size,
            max_pages: self.max_pages,
            enrich_pages: self.enrich_pages,
            quota_floor: self.quota_floor,
        }
    }

    fn client(&self) -> Option<Arc<dyn GitHubApi>> {
        self.github_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|token| {
                Arc::new(HttpGitHubClient::with_base_url(token, &self.api_base))
                    as Arc<dyn GitHubApi>
            })
    }
}

/// Arguments for `activity-sync serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Shared secret expected as `Authorization: Bearer <secret>` on the sync route.
    #[arg(long, env = "SYNC_SECRET", hide_env_values = true)]
    pub sync_secret: Option<String>,
}

/// Arguments for `activity-sync sync`.
#[derive(Parser, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub github: GitHubArgs,

    /// Replace all stored events instead of fetching only new ones.
    #[arg(long)]
    pub full: bool,

    /// Output JSON to stdout instead of a summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `activity-sync status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// SQLite database URL.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Output JSON to stdout instead of a summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => {
            run_serve_command(args).await?;
        }
        Commands::Sync(args) => {
            run_sync_command(args).await?;
        }
        Commands::Status(args) => {
            run_status_command(args).await?;
        }
    }
    Ok(())
}

async fn open_database(url: &str) -> anyhow::Result<Database> {
    let db = Database::connect(url).await?;
    db.run_migrations().await?;
    Ok(db)
}

async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    init_metrics().map_err(|e| anyhow::anyhow!("Failed to initialize metrics: {}", e))?;

    let db = open_database(&args.github.database_url).await?;
    let mut state = AppState::new(db, args.github.settings());

    match (args.github.client(), args.github.github_username.clone()) {
        (Some(client), Some(username)) => {
            info!(username = %username, api_base = %args.github.api_base, "GitHub client configured");
            state = state.with_github(client, username);
        }
        _ => tracing::warn!("GITHUB_TOKEN or GITHUB_USERNAME not set; sync and contributions will fail"),
    }
    match args.sync_secret {
        Some(secret) if !secret.is_empty() => state = state.with_sync_secret(secret),
        _ => tracing::warn!("SYNC_SECRET not set; the sync endpoint will refuse all requests"),
    }

    server::serve(state, args.port).await?;
    Ok(())
}

async fn run_sync_command(args: SyncArgs) -> anyhow::Result<()> {
    let Some(client) = args.github.client() else {
        anyhow::bail!(
            "GITHUB_TOKEN is required but not set.\n\
             Provide it via --github-token <TOKEN> or set the GITHUB_TOKEN environment variable."
        );
    };
    let Some(username) = args.github.github_username.clone() else {
        anyhow::bail!(
            "GITHUB_USERNAME is required but not set.\n\
             Provide it via --github-username <LOGIN> or set the GITHUB_USERNAME environment variable."
        );
    };

    let db = open_database(&args.github.database_url).await?;
    let pipeline = SyncPipeline::new(client, db, username, args.github.settings())?;
    let report = pipeline.run(SyncMode::from_full_flag(args.full)).await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("Failed to serialize sync report: {}", e))?;
        println!("{}", json_output);
    } else {
        println!("Sync complete ({})", report.mode);
        println!("  New events:         {}", report.new_event_count);
        println!("  Duplicates skipped: {}", report.duplicates_skipped);
        println!("  Pages checked:      {}", report.pages_checked);
        println!("  Events in store:    {}", report.total_events_in_db);
        if report.partial {
            println!("  Stopped early: rate limit reached the floor; run again after reset");
        }
    }

    Ok(())
}

async fn run_status_command(args: StatusArgs) -> anyhow::Result<()> {
    let db = open_database(&args.database_url).await?;
    let rate_limit = db.rate_limit(CORE_RESOURCE).await?;
    let metadata = db.sync_metadata().await?;

    if args.json {
        let json_output = serde_json::to_string_pretty(&serde_json::json!({
            "rateLimit": rate_limit,
            "syncMetadata": metadata,
        }))?;
        println!("{}", json_output);
        return Ok(());
    }

    match rate_limit {
        Some(info) => println!(
            "Rate limit: {}/{} remaining, resets {} (checked {})",
            info.remaining,
            info.limit,
            info.reset_at(),
            info.checked_at
        ),
        None => println!("Rate limit: no snapshot recorded"),
    }

    match metadata {
        Some(meta) if meta.success => println!(
            "Last sync: {} ({}), {} new, {} total",
            meta.last_sync,
            if meta.full_refresh { "full" } else { "incremental" },
            meta.new_events,
            meta.total_events
        ),
        Some(meta) => println!(
            "Last sync: {} FAILED: {}",
            meta.last_sync,
            meta.error.unwrap_or_default()
        ),
        None => println!("Last sync: never"),
    }

    Ok(())
}
