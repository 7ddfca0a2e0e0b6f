//! NATS message handlers

pub mod import;
pub mod ping;
pub mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::db::PgStore;
use crate::services::import::{ImportLogStore, ImportStore};
use crate::services::import_processor::ImportProcessor;

/// Start all message handlers and the import batch consumer
pub async fn start_handlers(client: Client, store: PgStore, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let shared = Arc::new(store.clone());
    let import_store: Arc<dyn ImportStore> = shared.clone();
    let log_store: Arc<dyn ImportLogStore> = shared;

    let processor = Arc::new(
        ImportProcessor::new(
            client.clone(),
            Arc::clone(&import_store),
            Arc::clone(&log_store),
            PathBuf::from(&config.upload_dir),
        )
        .await?,
    );

    // Subscribe to all subjects
    let ping_sub = client.subscribe("swissairdry.ping").await?;
    let import_submit_sub = client.subscribe("swissairdry.import.csv.submit").await?;
    let import_logs_list_sub = client.subscribe("swissairdry.import.logs.list").await?;
    let import_logs_get_sub = client.subscribe("swissairdry.import.logs.get").await?;
    let stats_dashboard_sub = client.subscribe("swissairdry.stats.dashboard").await?;

    info!("Subscribed to NATS subjects");

    let client_ping = client.clone();
    let client_import_submit = client.clone();
    let client_logs_list = client.clone();
    let client_logs_get = client.clone();
    let client_stats = client.clone();

    let logs_list = Arc::clone(&log_store);
    let logs_get = Arc::clone(&log_store);
    let processor_submit = Arc::clone(&processor);
    let pool_stats = store.pool().clone();
    let limit_max = config.import_log_limit_max;

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let import_submit_handle = tokio::spawn(async move {
        import::handle_submit(client_import_submit, import_submit_sub, processor_submit).await
    });

    let import_logs_list_handle = tokio::spawn(async move {
        import::handle_logs_list(client_logs_list, import_logs_list_sub, logs_list, limit_max).await
    });

    let import_logs_get_handle = tokio::spawn(async move {
        import::handle_logs_get(client_logs_get, import_logs_get_sub, logs_get).await
    });

    let stats_dashboard_handle = tokio::spawn(async move {
        stats::handle_dashboard(client_stats, stats_dashboard_sub, pool_stats).await
    });

    // Batch consumer, strictly sequential
    let processor_main = Arc::clone(&processor);
    let import_processor_handle = tokio::spawn(async move {
        processor_main.start_processing().await
    });

    info!("All handlers started");

    // Wait for any handler to finish (which shouldn't happen normally)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = import_submit_handle => {
            error!("Import submit handler finished: {:?}", result);
        }
        result = import_logs_list_handle => {
            error!("Import logs list handler finished: {:?}", result);
        }
        result = import_logs_get_handle => {
            error!("Import logs get handler finished: {:?}", result);
        }
        result = stats_dashboard_handle => {
            error!("Stats dashboard handler finished: {:?}", result);
        }
        result = import_processor_handle => {
            error!("CSV import processor finished: {:?}", result);
        }
    }

    Ok(())
}
