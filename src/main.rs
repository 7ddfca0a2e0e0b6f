//! SwissAirDry Worker - CSV import and reconciliation backend
//!
//! This worker connects to NATS and handles messages from the frontend.
//! Uploaded CSV exports are queued on JetStream and imported one batch at a time.

mod cli;
mod config;
mod db;
mod handlers;
mod services;
mod types;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::services::import::{self, ImportLogStore, MemoryStore};
use crate::types::NewImportLog;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "worker.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,swissairdry_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())  // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))  // file
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Migrate => migrate().await,
        Command::Import { dir, dry_run } => {
            if dry_run {
                import_dry_run(&dir).await
            } else {
                import_dir(&dir).await
            }
        }
    }
}

async fn serve() -> Result<()> {
    info!("Starting SwissAirDry Worker...");

    // Load configuration
    let config = config::Config::from_env()?;
    info!("Configuration loaded");

    // Connect to database
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    // Run migrations
    db::run_migrations(&pool).await?;

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    // Start message handlers
    let handler_result = handlers::start_handlers(nats_client, db::PgStore::new(pool), &config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}

async fn migrate() -> Result<()> {
    let config = config::Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await
}

/// Run one batch against the database, recording it in the import log
async fn import_dir(dir: &Path) -> Result<()> {
    let config = config::Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let store = db::PgStore::new(pool);

    let summary = record_dir(&store, &store, dir).await?;
    print_summary(&summary)
}

/// Run one batch into memory only; nothing is persisted
async fn import_dry_run(dir: &Path) -> Result<()> {
    info!("Dry run: importing {} into memory", dir.display());
    let store = MemoryStore::new();

    let summary = record_dir(&store, &store, dir).await?;
    let state = store.snapshot();
    info!(
        "Dry run result: {} customers, {} devices, {} jobs, {} assignments, {} measurements, {} logs, {} reports",
        state.customers.len(),
        state.devices.len(),
        state.jobs.len(),
        state.job_devices.len(),
        state.measurements.len(),
        state.system_logs.len(),
        state.reports.len()
    );
    print_summary(&summary)
}

async fn record_dir(
    store: &dyn import::ImportStore,
    logs: &dyn ImportLogStore,
    dir: &Path,
) -> Result<import::BatchSummary> {
    let sources = import::sources_from_dir(dir)
        .with_context(|| format!("Cannot read import directory {}", dir.display()))?;
    if sources.is_empty() {
        warn!("No CSV files found in {}", dir.display());
    }

    let filenames: Vec<String> = sources.iter().map(|s| s.filename.clone()).collect();
    let log = logs
        .create_import_log(&NewImportLog::for_files(&filenames, Some(dir.display().to_string())))
        .await?;

    import::import_and_record(store, logs, log.id, &sources).await
}

fn print_summary(summary: &import::BatchSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    if summary.fatal_error.is_some() {
        anyhow::bail!("{}", summary.message());
    }
    Ok(())
}
