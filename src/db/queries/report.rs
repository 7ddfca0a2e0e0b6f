//! Report and report image queries

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::{Report, ReportImage};

/// Find the report of a job for one day
pub async fn find_report(pool: &PgPool, job_id: Uuid, report_date: NaiveDate) -> Result<Option<Report>> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        SELECT id, job_id, title, content, report_type, report_date, created_at, updated_at
        FROM reports
        WHERE job_id = $1 AND report_date = $2
        ORDER BY created_at
        LIMIT 1
        "#
    )
    .bind(job_id)
    .bind(report_date)
    .fetch_optional(pool)
    .await?;

    Ok(report)
}

pub async fn insert_report(pool: &PgPool, report: &Report) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reports (id, job_id, title, content, report_type, report_date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#
    )
    .bind(report.id)
    .bind(report.job_id)
    .bind(&report.title)
    .bind(&report.content)
    .bind(&report.report_type)
    .bind(report.report_date)
    .bind(report.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_report(pool: &PgPool, report: &Report) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE reports SET
            title = $2,
            content = $3,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(report.id)
    .bind(&report.title)
    .bind(&report.content)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn image_exists(pool: &PgPool, report_id: Uuid, image_path: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM report_images WHERE report_id = $1 AND image_path = $2)"
    )
    .bind(report_id)
    .bind(image_path)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn insert_image(pool: &PgPool, image: &ReportImage) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO report_images (id, report_id, image_path, caption, sort_order, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#
    )
    .bind(image.id)
    .bind(image.report_id)
    .bind(&image.image_path)
    .bind(&image.caption)
    .bind(image.sort_order)
    .bind(image.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
