//! Dashboard aggregate queries

use chrono::NaiveDate;
use sqlx::PgPool;
use anyhow::Result;

use crate::types::{DashboardStats, DeviceTypeCount, DeviceStatus, JobStatus, DRYING_CATEGORIES};

#[derive(sqlx::FromRow)]
struct JobCounts {
    total: i64,
    active: i64,
    completed: i64,
    drying: i64,
}

#[derive(sqlx::FromRow)]
struct DeviceCounts {
    total: i64,
    active: i64,
}

/// Aggregate jobs created within `[start, end]` and the current device fleet
pub async fn dashboard_stats(pool: &PgPool, start: NaiveDate, end: NaiveDate) -> Result<DashboardStats> {
    let categories: Vec<String> = DRYING_CATEGORIES.iter().map(|c| c.to_string()).collect();

    let jobs = sqlx::query_as::<_, JobCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE j.status = $3) AS active,
            COUNT(*) FILTER (WHERE j.status = $4) AS completed,
            COUNT(*) FILTER (
                WHERE j.status = $3 AND EXISTS (
                    SELECT 1 FROM job_devices jd
                    JOIN devices d ON d.id = jd.device_id
                    WHERE jd.job_id = j.id AND d.category = ANY($5)
                )
            ) AS drying
        FROM jobs j
        WHERE j.created_at::date BETWEEN $1 AND $2
        "#
    )
    .bind(start)
    .bind(end)
    .bind(JobStatus::Active.as_str())
    .bind(JobStatus::Completed.as_str())
    .bind(&categories)
    .fetch_one(pool)
    .await?;

    let devices = sqlx::query_as::<_, DeviceCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = $1) AS active
        FROM devices
        "#
    )
    .bind(DeviceStatus::Active.as_str())
    .fetch_one(pool)
    .await?;

    let devices_by_type = sqlx::query_as::<_, DeviceTypeCount>(
        r#"
        SELECT category, COUNT(*) AS count
        FROM devices
        GROUP BY category
        ORDER BY count DESC, category
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(DashboardStats {
        start_date: start,
        end_date: end,
        total_jobs: jobs.total,
        active_jobs: jobs.active,
        completed_jobs: jobs.completed,
        drying_jobs: jobs.drying,
        total_devices: devices.total,
        active_devices: devices.active,
        devices_by_type,
    })
}
