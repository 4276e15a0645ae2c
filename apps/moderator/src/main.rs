mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{ArgGroup, Parser, Subcommand};
use config::{load_settings, load_settings_from, ModeratorSettings};
use review_console::{
    ConsoleConfig, ConsoleLocation, IntentOutcome, RestReviewAdapter, ReviewConsole,
};
use shared::domain::{ContentKind, ItemId, ReviewDecision, ReviewStatus, Role};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moderator", about = "Work the review queues of the study platform")]
struct Args {
    /// Settings file; defaults to ./moderator.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    page_limit: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of a review tab.
    List {
        #[arg(long)]
        kind: ContentKind,
        #[arg(long, default_value = "pending")]
        status: ReviewStatus,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Show per-status counts.
    Counts {
        #[arg(long)]
        kind: ContentKind,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Approve or reject a pending item.
    #[command(group(ArgGroup::new("decision").required(true).args(["approve", "reject"])))]
    Review {
        #[arg(long)]
        kind: ContentKind,
        id: String,
        #[arg(long)]
        approve: bool,
        #[arg(long)]
        reject: bool,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Delete a pending item. Admin only.
    Remove {
        #[arg(long)]
        kind: ContentKind,
        id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "")]
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => load_settings_from(path, |key| std::env::var(key).ok())?,
        None => load_settings()?,
    };
    if let Some(url) = args.server_url {
        settings.server_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = args.token {
        settings.token = Some(token);
    }
    if let Some(role) = args.role {
        settings.role = role;
    }
    if let Some(limit) = args.page_limit {
        if limit == 0 {
            bail!("--page-limit must be at least 1");
        }
        settings.page_limit = limit;
    }

    match args.command {
        Command::List {
            kind,
            status,
            page,
            query,
        } => {
            let console = open_console(&settings, kind, status, page, query);
            console.refresh().await;
            print_state(&console).await
        }
        Command::Counts { kind, query } => {
            let console = open_console(&settings, kind, ReviewStatus::Pending, 1, query);
            console.refresh_counts().await;
            print_state(&console).await
        }
        Command::Review {
            kind,
            id,
            approve,
            reject: _,
            comment,
            page,
            query,
        } => {
            if !settings.role.can_review() {
                bail!("role {:?} cannot review content", settings.role);
            }
            let decision = if approve {
                ReviewDecision::Approved
            } else {
                ReviewDecision::Rejected
            };
            let console = open_console(&settings, kind, ReviewStatus::Pending, page, query);
            console.refresh().await;
            let outcome = console
                .review(&ItemId::new(id.clone()), decision, comment)
                .await?;
            if outcome == IntentOutcome::Ignored {
                bail!("{id} is not on pending page {page} of {kind}");
            }
            info!(%kind, item_id = %id, %decision, ?outcome, "review submitted");
            print_state(&console).await
        }
        Command::Remove {
            kind,
            id,
            page,
            query,
        } => {
            if !settings.role.can_remove() {
                bail!("removing content requires the admin role");
            }
            let console = open_console(&settings, kind, ReviewStatus::Pending, page, query);
            console.refresh().await;
            let outcome = console.remove(&ItemId::new(id.clone())).await?;
            if outcome == IntentOutcome::Ignored {
                bail!("{id} is not on pending page {page} of {kind}");
            }
            info!(%kind, item_id = %id, ?outcome, "removal submitted");
            print_state(&console).await
        }
    }
}

fn open_console(
    settings: &ModeratorSettings,
    kind: ContentKind,
    tab: ReviewStatus,
    page: u32,
    query: String,
) -> ReviewConsole<RestReviewAdapter> {
    let mut adapter = RestReviewAdapter::new(settings.server_url.clone(), kind)
        .with_count_strategy(settings.count_strategy_for(kind));
    if let Some(token) = &settings.token {
        adapter = adapter.with_bearer_token(token.clone());
    }
    ReviewConsole::with_location(
        Arc::new(adapter),
        ConsoleConfig {
            page_limit: settings.page_limit,
        },
        ConsoleLocation { tab, page, query },
    )
}

async fn print_state(console: &ReviewConsole<RestReviewAdapter>) -> Result<()> {
    let state = console.snapshot().await;
    println!("{}", serde_json::to_string_pretty(&state)?);
    eprintln!("location: ?{}", state.location().to_query_string());
    fail_on_error(&state.last_error)
}

fn fail_on_error(last_error: &Option<review_console::AdapterError>) -> Result<()> {
    match last_error {
        Some(err) if err.requires_reauth() => bail!("{err}; sign in again and retry"),
        Some(err) => bail!("{err}"),
        None => Ok(()),
    }
}
