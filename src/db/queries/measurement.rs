//! Measurement and system log queries
//!
//! Both tables are append-only from the import side.

use sqlx::PgPool;
use anyhow::Result;

use crate::types::{Measurement, SystemLog};

pub async fn insert_measurement(pool: &PgPool, measurement: &Measurement) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO measurements (
            id, device_id, job_id, timestamp, temperature, humidity,
            energy_consumption, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#
    )
    .bind(measurement.id)
    .bind(measurement.device_id)
    .bind(measurement.job_id)
    .bind(measurement.timestamp)
    .bind(measurement.temperature)
    .bind(measurement.humidity)
    .bind(measurement.energy_consumption)
    .bind(measurement.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_system_log(pool: &PgPool, log: &SystemLog) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO system_logs (id, level, source, job_id, message, timestamp, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#
    )
    .bind(log.id)
    .bind(&log.level)
    .bind(&log.source)
    .bind(log.job_id)
    .bind(&log.message)
    .bind(log.timestamp)
    .bind(log.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
