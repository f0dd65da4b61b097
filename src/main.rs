use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use survivor_pool::blob::LocalBlobStore;
use survivor_pool::models::{UserId, WeekId};
use survivor_pool::store::MemoryStore;
use survivor_pool::{Config, Coordinator};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Survivor pool results engine",
    long_about = "Syncs the NFL scoreboard into the pool store, resolves picks, eliminates entries, and publishes reveal, matrix, and per-user snapshots.

Environment:
  SURVIVOR_BUCKET            Snapshot bucket (required to publish)
  SURVIVOR_BUCKET_PREFIX     Key prefix inside the bucket
  SURVIVOR_BLOB_ROOT         Directory backing the blob store (default blobs)
  SURVIVOR_DATA              JSON store file (default survivor-data.json)
  ESPN_BASE_URL              Scoreboard URL
  SURVIVOR_FETCH_RETRIES     Extra fetch attempts on 5xx/network errors (default 1)
  SURVIVOR_FETCH_BACKOFF_MS  Backoff step between attempts (default 500)"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync, update picks, and publish the reveal and matrix snapshots
    Run {
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        week: Option<u32>,
    },
    /// Replace one week's games with the provider's slate
    Sync {
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        week: Option<u32>,
    },
    /// Update pick statuses for a week and publish its reveal snapshot
    Aggregate {
        #[arg(long)]
        week_id: WeekId,
    },
    /// Publish the season history matrix
    Matrix {
        #[arg(long)]
        season: Option<i32>,
    },
    /// Publish reveal snapshots for every week of a season
    Reveal {
        #[arg(long)]
        season: i32,
    },
    /// Publish one user's entries with their picks
    UserEntries {
        #[arg(long)]
        user_id: UserId,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    better_panic::install();
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let store = Arc::new(MemoryStore::load(&config.data_file).await?);
    let blobs = Arc::new(LocalBlobStore::new(config.blob_root.clone()));
    let coordinator = Coordinator::new(
        store.clone(),
        Arc::new(config.scoreboard_client()),
        blobs,
        &config,
    );

    let outcome = execute(&coordinator, cli.command).await;
    store.save(&config.data_file).await?;
    info!("store saved to {}", config.data_file.display());

    let (output, ok) = outcome?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    if !ok {
        error!("one or more stages failed");
        std::process::exit(1);
    }
    Ok(())
}

/// Runs the command, returning its JSON output and whether every part succeeded.
async fn execute(coordinator: &Coordinator, command: Command) -> anyhow::Result<(Value, bool)> {
    let now = chrono::Utc::now();
    match command {
        Command::Run { season, week } => {
            let report = coordinator.run_at(now, season, week).await;
            Ok((serde_json::to_value(&report)?, report.all_ok()))
        }
        Command::Sync { season, week } => done(coordinator.sync(season, week).await?),
        Command::Aggregate { week_id } => done(coordinator.aggregate(week_id, now).await?),
        Command::Matrix { season } => done(coordinator.publish_matrix(season, now).await?),
        Command::Reveal { season } => done(coordinator.publish_reveals(season, now).await?),
        Command::UserEntries { user_id } => {
            done(coordinator.publish_user_entries(user_id, now).await?)
        }
    }
}

fn done<T: Serialize>(report: T) -> anyhow::Result<(Value, bool)> {
    Ok((serde_json::to_value(report)?, true))
}
