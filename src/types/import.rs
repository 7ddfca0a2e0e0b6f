//! CSV import log and request types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Batch status; `processing` moves to one of the terminal states exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Processing,
    Completed,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    Single,
    Multi,
}

impl ImportType {
    pub fn for_file_count(count: usize) -> Self {
        if count > 1 {
            ImportType::Multi
        } else {
            ImportType::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::Single => "single",
            ImportType::Multi => "multi",
        }
    }
}

/// One durable record per upload batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImportLog {
    pub id: i64,
    /// Comma separated for multi-file batches
    pub filename: String,
    pub stored_path: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub import_type: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating an import log in `processing` state
#[derive(Debug, Clone)]
pub struct NewImportLog {
    pub filename: String,
    pub stored_path: Option<String>,
    pub import_type: ImportType,
    pub message: String,
}

impl NewImportLog {
    pub fn for_files(filenames: &[String], stored_path: Option<String>) -> Self {
        Self {
            filename: filenames.join(", "),
            stored_path,
            import_type: ImportType::for_file_count(filenames.len()),
            message: format!("{} Datei(en) in Verarbeitung", filenames.len()),
        }
    }
}

// =============================================================================
// NATS PAYLOADS
// =============================================================================

/// One uploaded file, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUploadFile {
    pub filename: String,
    pub content_base64: String,
}

/// Request to import one or many CSV files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImportSubmitRequest {
    #[serde(default)]
    pub files: Vec<CsvUploadFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImportSubmitResponse {
    pub log_id: i64,
    pub filenames: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLogListRequest {
    pub limit: Option<i64>,
}

/// List entry, without the details payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLogSummary {
    pub id: i64,
    pub filename: String,
    pub status: String,
    pub message: Option<String>,
    pub import_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<ImportLog> for ImportLogSummary {
    fn from(log: ImportLog) -> Self {
        Self {
            id: log.id,
            filename: log.filename,
            status: log.status,
            message: log.message,
            import_type: log.import_type,
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLogListResponse {
    pub logs: Vec<ImportLogSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLogGetRequest {
    pub id: i64,
}
