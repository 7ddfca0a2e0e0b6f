//! CSV import JetStream processor
//!
//! Uploads are validated and stored on submit, then queued. A single durable
//! consumer runs the batches strictly one after another, so only one batch
//! writes to the store at a time.
//!
//! ## Streams
//! - `SWISSAIRDRY_CSV_IMPORT` - queued CSV batches

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use async_nats::jetstream::{self, Context as JsContext};
use async_nats::Client;
use base64::Engine;
use futures::StreamExt;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::import::{self, has_csv_extension, CsvSource, ImportLogStore, ImportStore};
use crate::types::{
    CsvImportSubmitRequest, CsvImportSubmitResponse, ImportJobStatus, ImportJobStatusUpdate,
    ImportStatus, NewImportLog, QueuedCsvImport,
};

// Stream and consumer names
const STREAM_NAME: &str = "SWISSAIRDRY_CSV_IMPORT";
const CONSUMER_NAME: &str = "csv_import_worker";
const SUBJECT: &str = "swissairdry.jobs.import.csv";
const STATUS_PREFIX: &str = "swissairdry.import.csv.status";

/// Rejected upload; nothing has been stored
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no files in request")]
    NoFiles,
    #[error("only .csv files are accepted: {0}")]
    InvalidFileType(String),
    #[error("invalid filename: {0}")]
    InvalidFilename(String),
    #[error("filename appears more than once in the batch: {0}")]
    DuplicateFilename(String),
    #[error("content of {filename} is not valid base64: {source}")]
    InvalidContent {
        filename: String,
        source: base64::DecodeError,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::NoFiles => "NO_FILES",
            SubmitError::InvalidFileType(_) => "INVALID_FILE_TYPE",
            SubmitError::InvalidFilename(_)
            | SubmitError::DuplicateFilename(_)
            | SubmitError::InvalidContent { .. } => "INVALID_REQUEST",
            SubmitError::Internal(_) => "SUBMIT_ERROR",
        }
    }
}

/// Check every file before anything is written; returns (filename, bytes).
///
/// Files share one batch directory, so stored names must be unique
/// (case-insensitive, for case-folding filesystems).
pub fn validate_upload(request: &CsvImportSubmitRequest) -> Result<Vec<(String, Vec<u8>)>, SubmitError> {
    if request.files.is_empty() {
        return Err(SubmitError::NoFiles);
    }
    if let Some(file) = request.files.iter().find(|f| !has_csv_extension(&f.filename)) {
        return Err(SubmitError::InvalidFileType(file.filename.clone()));
    }

    let mut seen = HashSet::new();
    request
        .files
        .iter()
        .map(|file| {
            // Strip any directory part of the client-supplied name
            let filename = Path::new(&file.filename)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .filter(|name| has_csv_extension(name))
                .ok_or_else(|| SubmitError::InvalidFilename(file.filename.clone()))?;
            if !seen.insert(filename.to_lowercase()) {
                return Err(SubmitError::DuplicateFilename(filename));
            }
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.content_base64.trim())
                .map_err(|source| SubmitError::InvalidContent {
                    filename: file.filename.clone(),
                    source,
                })?;
            Ok((filename, bytes))
        })
        .collect()
}

/// CSV import processor with JetStream integration
pub struct ImportProcessor {
    client: Client,
    js: JsContext,
    store: Arc<dyn ImportStore>,
    logs: Arc<dyn ImportLogStore>,
    upload_dir: PathBuf,
}

impl ImportProcessor {
    /// Create a new import processor, initializing the JetStream stream
    pub async fn new(
        client: Client,
        store: Arc<dyn ImportStore>,
        logs: Arc<dyn ImportLogStore>,
        upload_dir: PathBuf,
    ) -> Result<Self> {
        let js = jetstream::new(client.clone());

        let stream_config = jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: vec![SUBJECT.to_string()],
            max_messages: 1_000,
            max_bytes: 10 * 1024 * 1024, // Messages only carry paths
            retention: jetstream::stream::RetentionPolicy::WorkQueue,
            ..Default::default()
        };
        js.get_or_create_stream(stream_config).await?;
        info!("JetStream import stream '{}' ready", STREAM_NAME);

        Ok(Self {
            client,
            js,
            store,
            logs,
            upload_dir,
        })
    }

    /// Validate, store and queue an uploaded batch
    pub async fn submit(&self, request: CsvImportSubmitRequest) -> Result<CsvImportSubmitResponse, SubmitError> {
        let files = validate_upload(&request)?;
        let filenames: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();

        let batch_dir = self.upload_dir.join(Uuid::new_v4().to_string());
        store_files(&batch_dir, &files).await?;
        let stored_path = batch_dir.to_string_lossy().into_owned();

        let log = self
            .logs
            .create_import_log(&NewImportLog::for_files(&filenames, Some(stored_path.clone())))
            .await?;

        let job = QueuedCsvImport::new(log.id, stored_path, filenames.clone());
        if let Err(e) = self.enqueue(&job).await {
            error!("Failed to queue CSV import {}: {:#}", log.id, e);
            fail_import_log(self.logs.as_ref(), log.id, &format!("Import konnte nicht eingereiht werden: {:#}", e))
                .await;
            return Err(e.into());
        }

        info!("CSV import {} queued: {} file(s)", log.id, filenames.len());
        self.notify(log.id, ImportJobStatus::Queued { file_count: filenames.len() })
            .await;

        Ok(CsvImportSubmitResponse {
            log_id: log.id,
            message: format!("{} Datei(en) hochgeladen, Import gestartet", filenames.len()),
            filenames,
        })
    }

    async fn enqueue(&self, job: &QueuedCsvImport) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        self.js
            .publish(SUBJECT.to_string(), payload.into())
            .await?
            .await?;
        Ok(())
    }

    /// Status updates are best effort; the import log is the durable record
    async fn notify(&self, log_id: i64, status: ImportJobStatus) {
        if let Err(e) = self.publish_status(log_id, status).await {
            warn!("Failed to publish status for CSV import {}: {}", log_id, e);
        }
    }

    /// Publish a batch status update
    pub async fn publish_status(&self, log_id: i64, status: ImportJobStatus) -> Result<()> {
        let update = ImportJobStatusUpdate::new(log_id, status);
        let subject = format!("{}.{}", STATUS_PREFIX, log_id);
        let payload = serde_json::to_vec(&update)?;

        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }

    /// Start processing queued batches
    pub async fn start_processing(self: Arc<Self>) -> Result<()> {
        let stream = self.js.get_stream(STREAM_NAME).await?;

        let consumer_config = jetstream::consumer::pull::Config {
            durable_name: Some(CONSUMER_NAME.to_string()),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            max_deliver: 1,
            filter_subject: SUBJECT.to_string(),
            ..Default::default()
        };

        let consumer = stream.get_or_create_consumer(CONSUMER_NAME, consumer_config).await?;
        info!("JetStream import consumer '{}' ready", CONSUMER_NAME);

        let mut messages = consumer.messages().await?;

        while let Some(msg) = messages.next().await {
            match msg {
                Ok(msg) => {
                    // Batches are never retried, ack before running
                    if let Err(e) = msg.ack().await {
                        error!("Failed to ack import batch: {:?}", e);
                    }
                    // Sequential: one batch against the store at a time
                    if let Err(e) = self.process_batch(&msg.payload).await {
                        error!("Failed to process import batch: {}", e);
                    }
                }
                Err(e) => {
                    error!("Error receiving import message: {}", e);
                }
            }
        }

        Ok(())
    }

    async fn process_batch(&self, payload: &[u8]) -> Result<()> {
        let job = match decode_queued(self.logs.as_ref(), payload).await? {
            Decoded::Batch(job) => job,
            Decoded::Rejected { log_id, error } => {
                self.notify(log_id, ImportJobStatus::Failed { error }).await;
                return Ok(());
            }
        };

        info!("Processing CSV import {} ({} files)", job.log_id, job.filenames.len());
        self.notify(job.log_id, ImportJobStatus::Processing { file_count: job.filenames.len() })
            .await;

        let status = run_queued(self.store.as_ref(), self.logs.as_ref(), &job).await;
        self.notify(job.log_id, status).await;

        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuedLogId {
    log_id: i64,
}

enum Decoded {
    Batch(QueuedCsvImport),
    /// Payload unusable, its log is already finished as `error`
    Rejected { log_id: i64, error: String },
}

/// Decode a queued batch. A payload that cannot be decoded but still names
/// its log finishes that log as `error`.
async fn decode_queued(logs: &dyn ImportLogStore, payload: &[u8]) -> Result<Decoded> {
    match serde_json::from_slice::<QueuedCsvImport>(payload) {
        Ok(job) => Ok(Decoded::Batch(job)),
        Err(e) => {
            let log_id = serde_json::from_slice::<QueuedLogId>(payload)
                .map(|id| id.log_id)
                .map_err(|_| anyhow!("Unreadable import batch without log id: {}", e))?;
            let error = format!("Importauftrag nicht lesbar: {}", e);
            fail_import_log(logs, log_id, &error).await;
            Ok(Decoded::Rejected { log_id, error })
        }
    }
}

/// Run a decoded batch; returns the terminal status to publish
async fn run_queued(store: &dyn ImportStore, logs: &dyn ImportLogStore, job: &QueuedCsvImport) -> ImportJobStatus {
    let start_time = Instant::now();
    let sources = batch_sources(Path::new(&job.stored_path), &job.filenames);

    match import::import_and_record(store, logs, job.log_id, &sources).await {
        Ok(summary) => {
            let duration_ms = start_time.elapsed().as_millis() as u64;
            ImportJobStatus::from_summary(&summary, duration_ms)
        }
        Err(e) => {
            warn!("CSV import {} could not be recorded: {}", job.log_id, e);
            fail_import_log(logs, job.log_id, &format!("CSV-Import fehlgeschlagen: {:#}", e)).await;
            ImportJobStatus::Failed { error: e.to_string() }
        }
    }
}

/// Move a log that is still `processing` to `error`
async fn fail_import_log(logs: &dyn ImportLogStore, log_id: i64, message: &str) {
    let details = serde_json::json!({ "error": message });
    match logs.finish_import_log(log_id, ImportStatus::Error, message, &details).await {
        Ok(true) => info!("Import log {} marked as error", log_id),
        Ok(false) => debug!("Import log {} was already finished", log_id),
        Err(e) => error!("Failed to mark import log {} as error: {}", log_id, e),
    }
}

async fn store_files(dir: &Path, files: &[(String, Vec<u8>)]) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    for (filename, bytes) in files {
        tokio::fs::write(dir.join(filename), bytes).await?;
    }
    Ok(())
}

/// Sources of a stored batch, in upload order
fn batch_sources(dir: &Path, filenames: &[String]) -> Vec<CsvSource> {
    filenames
        .iter()
        .map(|name| CsvSource::from_path(dir.join(name)))
        .collect()
}

// ==========================================================================
// Tests
// ==========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CsvUploadFile;

    fn upload(files: &[(&str, &str)]) -> CsvImportSubmitRequest {
        CsvImportSubmitRequest {
            files: files
                .iter()
                .map(|(name, content)| CsvUploadFile {
                    filename: name.to_string(),
                    content_base64: content.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_stream_names() {
        assert_eq!(STREAM_NAME, "SWISSAIRDRY_CSV_IMPORT");
        assert!(SUBJECT.starts_with("swissairdry.jobs.import"));
        assert!(STATUS_PREFIX.starts_with("swissairdry.import.csv.status"));
    }

    #[test]
    fn test_validate_upload_decodes_files() {
        // "A;B\n1;2\n"
        let files = validate_upload(&upload(&[("KUNDENSTAMM.CSV", "QTtCCjE7Mgo=")])).unwrap();
        assert_eq!(files[0].0, "KUNDENSTAMM.CSV");
        assert_eq!(files[0].1, b"A;B\n1;2\n");
    }

    #[test]
    fn test_validate_upload_rejects_non_csv_anywhere() {
        let err = validate_upload(&upload(&[("a.csv", "QQo="), ("b.xlsx", "QQo=")])).unwrap_err();
        assert_eq!(err.code(), "INVALID_FILE_TYPE");
    }

    #[test]
    fn test_validate_upload_empty_and_bad_base64() {
        assert_eq!(validate_upload(&upload(&[])).unwrap_err().code(), "NO_FILES");
        assert_eq!(
            validate_upload(&upload(&[("a.csv", "%%%")])).unwrap_err().code(),
            "INVALID_REQUEST"
        );
    }

    #[test]
    fn test_validate_upload_strips_directories() {
        let files = validate_upload(&upload(&[("../../etc/x.csv", "QQo=")])).unwrap();
        assert_eq!(files[0].0, "x.csv");
    }

    #[test]
    fn test_validate_upload_rejects_same_name_twice() {
        let err = validate_upload(&upload(&[
            ("a/GERAETESTAMMVERZEICHNISS.csv", "QQo="),
            ("b/GERAETESTAMMVERZEICHNISS.csv", "Qgo="),
        ]))
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");

        let err = validate_upload(&upload(&[("kunden.csv", "QQo="), ("KUNDEN.CSV", "QQo=")])).unwrap_err();
        assert!(matches!(err, SubmitError::DuplicateFilename(ref name) if name == "KUNDEN.CSV"));
    }

    async fn processing_log(logs: &import::MemoryStore, dir: &Path, filenames: &[String]) -> QueuedCsvImport {
        let stored_path = dir.to_string_lossy().into_owned();
        let log = logs
            .create_import_log(&NewImportLog::for_files(filenames, Some(stored_path.clone())))
            .await
            .unwrap();
        QueuedCsvImport::new(log.id, stored_path, filenames.to_vec())
    }

    #[tokio::test]
    async fn test_unreadable_batch_finishes_its_log() {
        let logs = import::MemoryStore::new();
        let job = processing_log(&logs, Path::new("/tmp/none"), &["a.csv".to_string()]).await;

        let payload = format!(r#"{{"logId":{},"storedPath":3}}"#, job.log_id);
        let decoded = decode_queued(&logs, payload.as_bytes()).await.unwrap();
        assert!(matches!(decoded, Decoded::Rejected { log_id, .. } if log_id == job.log_id));

        let log = logs.get_import_log(job.log_id).await.unwrap().unwrap();
        assert_eq!(log.status, "error");
        assert!(log.message.unwrap().contains("nicht lesbar"));

        assert!(decode_queued(&logs, b"not json").await.is_err());
    }

    #[tokio::test]
    async fn test_run_queued_completes_log() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![("AUFTRAGSPROTOKOLL.csv".to_string(), b"Auftragsnummer;Schadensart\nA-1;Wasser\n".to_vec())];
        store_files(dir.path(), &files).await.unwrap();

        let store = import::MemoryStore::new();
        let job = processing_log(&store, dir.path(), &["AUFTRAGSPROTOKOLL.csv".to_string()]).await;

        let status = run_queued(&store, &store, &job).await;
        assert!(matches!(status, ImportJobStatus::Completed { success_count: 1, .. }));
        let log = store.get_import_log(job.log_id).await.unwrap().unwrap();
        assert_eq!(log.status, "completed");
    }

    #[tokio::test]
    async fn test_run_queued_reports_failure_when_log_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let store = import::MemoryStore::new();
        let logs = import::MemoryStore::new();
        let job = processing_log(&logs, dir.path(), &[]).await;
        logs.set_unavailable(true);

        let status = run_queued(&store, &logs, &job).await;
        assert!(matches!(status, ImportJobStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_fail_import_log_keeps_finished_logs() {
        let logs = import::MemoryStore::new();
        let job = processing_log(&logs, Path::new("/tmp/none"), &["a.csv".to_string()]).await;

        fail_import_log(&logs, job.log_id, "Import konnte nicht eingereiht werden").await;
        fail_import_log(&logs, job.log_id, "later").await;

        let log = logs.get_import_log(job.log_id).await.unwrap().unwrap();
        assert_eq!(log.status, "error");
        assert_eq!(log.message.as_deref(), Some("Import konnte nicht eingereiht werden"));
    }

    #[tokio::test]
    async fn test_stored_batch_imports_in_upload_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            ("AUFTRAGSPROTOKOLL.csv".to_string(), b"Auftragsnummer;Schadensart\nA-1;Wasser\n".to_vec()),
            ("GERAETESTAMMVERZEICHNISS.csv".to_string(), b"Ger\xc3\xa4tenummer;Kategorie;Name\nD-1;X;Y\n".to_vec()),
        ];
        store_files(dir.path(), &files).await.unwrap();

        let names: Vec<String> = files.iter().map(|(n, _)| n.clone()).collect();
        let sources = batch_sources(dir.path(), &names);
        let store = import::MemoryStore::new();
        let summary = import::run_batch(&store, &sources).await;

        assert_eq!(summary.success_count, 2);
        assert_eq!(store.snapshot().devices.len(), 1);
    }
}
