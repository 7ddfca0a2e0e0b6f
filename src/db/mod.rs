//! Database module

pub mod pg_store;
pub mod queries;

pub use pg_store::PgStore;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// One sequential import consumer plus the request handlers
const MAX_CONNECTIONS: u32 = 5;

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("Cannot connect to PostgreSQL")?;

    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate!("./migrations");
    info!("Running {} database migration(s)...", migrator.iter().count());

    migrator
        .run(pool)
        .await
        .context("Database migration failed")?;

    info!("Database migrations complete");
    Ok(())
}
