//! Device database queries

use sqlx::PgPool;
use anyhow::Result;

use crate::types::Device;

pub async fn find_by_serial(pool: &PgPool, serial_number: &str) -> Result<Option<Device>> {
    let device = sqlx::query_as::<_, Device>(
        r#"
        SELECT id, serial_number, name, category, status, location, description,
               price_per_day, created_at, updated_at
        FROM devices
        WHERE serial_number = $1
        "#
    )
    .bind(serial_number)
    .fetch_optional(pool)
    .await?;

    Ok(device)
}

pub async fn insert_device(pool: &PgPool, device: &Device) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO devices (
            id, serial_number, name, category, status, location, description,
            price_per_day, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#
    )
    .bind(device.id)
    .bind(&device.serial_number)
    .bind(&device.name)
    .bind(&device.category)
    .bind(&device.status)
    .bind(&device.location)
    .bind(&device.description)
    .bind(device.price_per_day)
    .bind(device.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_device(pool: &PgPool, device: &Device) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE devices SET
            name = $2,
            category = $3,
            status = $4,
            location = $5,
            description = $6,
            price_per_day = $7,
            updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(device.id)
    .bind(&device.name)
    .bind(&device.category)
    .bind(&device.status)
    .bind(&device.location)
    .bind(&device.description)
    .bind(device.price_per_day)
    .execute(pool)
    .await?;

    Ok(())
}
