use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use poster::cli::{Cli, Command};
use poster::config::Config;
use poster::jobs::{run_daily, run_reset, run_weekly, JobOutcome};
use poster::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on malformed env vars)
    let config = cli.configure(Config::from_env()?);

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting poster v{} (budget {}, zone {}, dry run {})",
        env!("CARGO_PKG_VERSION"),
        config.post_budget,
        config.timezone,
        config.dry_run
    );

    let state = AppState::from_config(config)?;
    let now = Utc::now();

    match cli.command {
        Command::Daily => report(run_daily(&state, now).await?),
        Command::Weekly | Command::PreviewWeekly => report(run_weekly(&state, now).await?),
        Command::ResetLog => run_reset(&state, now).await?,
    }

    Ok(())
}

fn report(outcome: JobOutcome) {
    match outcome {
        JobOutcome::NothingToPost => info!("Nothing to post"),
        JobOutcome::SkippedOverBudget {
            event_id,
            length,
            budget,
        } => info!(%event_id, length, budget, "Skipped over-budget post"),
        JobOutcome::Preview { posts } => {
            for (i, post) in posts.iter().enumerate() {
                println!("--- {}/{} ---\n{post}\n", i + 1, posts.len());
            }
        }
        JobOutcome::Posted {
            post_ids,
            first_post_url,
        } => info!(
            posts = post_ids.len(),
            first_post_url = first_post_url.as_deref().unwrap_or("-"),
            "Published"
        ),
    }
}
