//! Reads donor-sourced tasks from the command line.
//!
//! Usage:
//!
//! ```text
//! donor-tasks list [--status <code>]
//! donor-tasks get <donor-task-id>
//! donor-tasks consistency
//! ```
//!
//! Configuration comes from the environment (see `DONOR_DB_URL` and the
//! other `DONOR_*` variables), optionally seeded from a `.env` file in the
//! working directory. Results are printed to standard output as JSON; logs
//! go to standard error and honour `RUST_LOG`.

use clap::{Parser, Subcommand};
use gtd_donor_bridge::{
    config::{ConfigError, DonorConfig},
    donor_task::{
        adapters::HttpDonorGateway,
        domain::{ConsistencyReport, DonorTaskId},
        ports::DonorTaskGateway,
        services::{DonorSyncError, DonorTaskService, SyncSettings},
    },
};
use mockable::{Clock, DefaultClock};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "donor-tasks", version, about = "Read donor-sourced GTD tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List donor tasks.
    List {
        /// Only show tasks with this raw donor status.
        #[arg(long)]
        status: Option<String>,
    },
    /// Show a single donor task.
    Get {
        /// Donor task identifier.
        id: String,
    },
    /// Compare cached tasks with a live fetch.
    Consistency,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sync(#[from] DonorSyncError),
    #[error("donor task {0} not found")]
    NotFound(DonorTaskId),
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

type Service = DonorTaskService<HttpDonorGateway, DefaultClock>;

fn main() -> Result<(), BoxError> {
    // A missing .env file is normal outside development.
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli)).map_err(Into::into)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = DonorConfig::from_env()?;
    let gateway = HttpDonorGateway::new(&config)?;
    let service: Service = DonorTaskService::new(
        Arc::new(gateway),
        Arc::new(DefaultClock),
        SyncSettings::from_config(&config),
    );
    tracing::debug!(base_url = %config.base_url(), "donor service configured");

    match cli.command {
        Command::List { status } => {
            let snapshot = service.list_tasks(status.as_deref()).await?;
            if snapshot.is_stale() {
                tracing::warn!(fetched_at = %snapshot.fetched_at(), "donor tasks are stale");
            }
            emit(&snapshot)
        }
        Command::Get { id } => {
            let donor_task_id = DonorTaskId::new(id);
            let snapshot = service.get_task(&donor_task_id).await?;
            let task = snapshot
                .into_value()
                .ok_or(CliError::NotFound(donor_task_id))?;
            emit(&task)
        }
        Command::Consistency => emit(&consistency_report(&service).await?),
    }
}

/// Loads a baseline through the cache, then compares it with a live fetch.
///
/// Each CLI run starts with an empty cache, so without the first read the
/// check would have nothing to compare.
async fn consistency_report<G, C>(
    service: &DonorTaskService<G, C>,
) -> Result<ConsistencyReport, CliError>
where
    G: DonorTaskGateway + 'static,
    C: Clock + Send + Sync + 'static,
{
    let baseline = service.get_donor_tasks().await?;
    tracing::debug!(cached = baseline.value().len(), "consistency baseline loaded");
    Ok(service.check_consistency().await)
}

fn emit(value: &impl Serialize) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
