//! Job and job-device assignment queries

use sqlx::PgPool;
use uuid::Uuid;
use anyhow::Result;

use crate::types::{Job, JobDevice};

// ============================================================================
// Jobs
// ============================================================================

pub async fn find_by_number(pool: &PgPool, job_number: &str) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, job_number, customer_id, description, status, address,
               insurance_number, damage_type, rooms, start_date, end_date,
               created_at, updated_at
        FROM jobs
        WHERE job_number = $1
        "#
    )
    .bind(job_number)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

pub async fn insert_job(pool: &PgPool, job: &Job) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, job_number, customer_id, description, status, address,
            insurance_number, damage_type, rooms, start_date, end_date, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#
    )
    .bind(job.id)
    .bind(&job.job_number)
    .bind(job.customer_id)
    .bind(&job.description)
    .bind(&job.status)
    .bind(&job.address)
    .bind(&job.insurance_number)
    .bind(&job.damage_type)
    .bind(&job.rooms)
    .bind(job.start_date)
    .bind(job.end_date)
    .bind(job.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_job(pool: &PgPool, job: &Job) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs SET
            customer_id = $2,
            description = $3,
            status = $4,
            address = $5,
            insurance_number = $6,
            damage_type = $7,
            rooms = $8,
            start_date = $9,
            end_date = $10,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(job.id)
    .bind(job.customer_id)
    .bind(&job.description)
    .bind(&job.status)
    .bind(&job.address)
    .bind(&job.insurance_number)
    .bind(&job.damage_type)
    .bind(&job.rooms)
    .bind(job.start_date)
    .bind(job.end_date)
    .execute(pool)
    .await?;

    Ok(())
}

// ============================================================================
// Assignments
// ============================================================================

pub async fn find_job_device(pool: &PgPool, job_id: Uuid, device_id: Uuid) -> Result<Option<JobDevice>> {
    let job_device = sqlx::query_as::<_, JobDevice>(
        r#"
        SELECT id, job_id, device_id, installation_date, removal_date, location,
               status, initial_reading, final_reading, notes, created_at, updated_at
        FROM job_devices
        WHERE job_id = $1 AND device_id = $2
        "#
    )
    .bind(job_id)
    .bind(device_id)
    .fetch_optional(pool)
    .await?;

    Ok(job_device)
}

pub async fn insert_job_device(pool: &PgPool, job_device: &JobDevice) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO job_devices (
            id, job_id, device_id, installation_date, removal_date, location,
            status, initial_reading, final_reading, notes, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#
    )
    .bind(job_device.id)
    .bind(job_device.job_id)
    .bind(job_device.device_id)
    .bind(job_device.installation_date)
    .bind(job_device.removal_date)
    .bind(&job_device.location)
    .bind(&job_device.status)
    .bind(job_device.initial_reading)
    .bind(job_device.final_reading)
    .bind(&job_device.notes)
    .bind(job_device.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_job_device(pool: &PgPool, job_device: &JobDevice) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE job_devices SET
            installation_date = $2,
            removal_date = $3,
            location = $4,
            status = $5,
            initial_reading = $6,
            final_reading = $7,
            notes = $8,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(job_device.id)
    .bind(job_device.installation_date)
    .bind(job_device.removal_date)
    .bind(&job_device.location)
    .bind(&job_device.status)
    .bind(job_device.initial_reading)
    .bind(job_device.final_reading)
    .bind(&job_device.notes)
    .execute(pool)
    .await?;

    Ok(())
}
