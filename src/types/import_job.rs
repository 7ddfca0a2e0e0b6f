//! Queued CSV import jobs for JetStream-based processing

use serde::{Deserialize, Serialize};

use crate::services::import::BatchSummary;

/// A queued import batch in JetStream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedCsvImport {
    /// Import log created at submit time
    pub log_id: i64,
    /// Directory holding the stored files
    pub stored_path: String,
    /// Filenames in upload order
    pub filenames: Vec<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl QueuedCsvImport {
    pub fn new(log_id: i64, stored_path: String, filenames: Vec<String>) -> Self {
        Self {
            log_id,
            stored_path,
            filenames,
            submitted_at: chrono::Utc::now(),
        }
    }
}

/// Status of an import batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportJobStatus {
    /// Batch is waiting in queue
    #[serde(rename_all = "camelCase")]
    Queued { file_count: usize },
    #[serde(rename_all = "camelCase")]
    Processing { file_count: usize },
    #[serde(rename_all = "camelCase")]
    Completed {
        success_count: u32,
        error_count: u32,
        duration_ms: u64,
    },
    /// Store failure, the batch stopped
    #[serde(rename_all = "camelCase")]
    Failed { error: String },
}

impl ImportJobStatus {
    pub fn from_summary(summary: &BatchSummary, duration_ms: u64) -> Self {
        match &summary.fatal_error {
            Some(error) => ImportJobStatus::Failed { error: error.clone() },
            None => ImportJobStatus::Completed {
                success_count: summary.success_count,
                error_count: summary.error_count,
                duration_ms,
            },
        }
    }
}

/// Status update for an import batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobStatusUpdate {
    pub log_id: i64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub status: ImportJobStatus,
}

impl ImportJobStatusUpdate {
    pub fn new(log_id: i64, status: ImportJobStatus) -> Self {
        Self {
            log_id,
            timestamp: chrono::Utc::now(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_job_status_queued_serializes() {
        let status = ImportJobStatus::Queued { file_count: 3 };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("queued"));
        assert!(json.contains("fileCount"));
    }

    #[test]
    fn test_import_job_status_completed_serializes() {
        let status = ImportJobStatus::Completed {
            success_count: 2,
            error_count: 1,
            duration_ms: 5000,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("completed"));
        assert!(json.contains("successCount"));
        assert!(json.contains("durationMs"));
    }

    #[test]
    fn test_status_from_summary_with_fatal_error() {
        let summary = BatchSummary {
            fatal_error: Some("connection reset".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ImportJobStatus::from_summary(&summary, 10),
            ImportJobStatus::Failed { .. }
        ));
    }

    #[test]
    fn test_queued_import_roundtrip() {
        let job = QueuedCsvImport::new(7, "/tmp/uploads/x".to_string(), vec!["a.csv".to_string()]);
        let json = serde_json::to_vec(&job).unwrap();
        let parsed: QueuedCsvImport = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.log_id, 7);
        assert_eq!(parsed.filenames, vec!["a.csv"]);
    }
}
