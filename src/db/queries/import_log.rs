//! CSV import log queries

use sqlx::PgPool;
use anyhow::Result;

use crate::types::{ImportLog, ImportStatus, NewImportLog};

/// Create a log in `processing` state
pub async fn create_import_log(pool: &PgPool, log: &NewImportLog) -> Result<ImportLog> {
    let record = sqlx::query_as::<_, ImportLog>(
        r#"
        INSERT INTO csv_import_logs (filename, stored_path, status, message, import_type, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id, filename, stored_path, status, message, import_type, details,
                  created_at, updated_at
        "#
    )
    .bind(&log.filename)
    .bind(&log.stored_path)
    .bind(ImportStatus::Processing.as_str())
    .bind(&log.message)
    .bind(log.import_type.as_str())
    .fetch_one(pool)
    .await?;

    Ok(record)
}

/// Move a `processing` log to its terminal state.
///
/// Returns false when the log does not exist or was already finished; a
/// finished log is never rewritten.
pub async fn finish_import_log(
    pool: &PgPool,
    id: i64,
    status: ImportStatus,
    message: &str,
    details: &serde_json::Value,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE csv_import_logs SET
            status = $2,
            message = $3,
            details = $4,
            updated_at = NOW()
        WHERE id = $1 AND status = $5
        "#
    )
    .bind(id)
    .bind(status.as_str())
    .bind(message)
    .bind(details)
    .bind(ImportStatus::Processing.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Newest logs first
pub async fn list_import_logs(pool: &PgPool, limit: i64) -> Result<Vec<ImportLog>> {
    let logs = sqlx::query_as::<_, ImportLog>(
        r#"
        SELECT id, filename, stored_path, status, message, import_type, details,
               created_at, updated_at
        FROM csv_import_logs
        ORDER BY id DESC
        LIMIT $1
        "#
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(logs)
}

pub async fn get_import_log(pool: &PgPool, id: i64) -> Result<Option<ImportLog>> {
    let log = sqlx::query_as::<_, ImportLog>(
        r#"
        SELECT id, filename, stored_path, status, message, import_type, details,
               created_at, updated_at
        FROM csv_import_logs
        WHERE id = $1
        "#
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(log)
}
