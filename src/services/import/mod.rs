//! CSV import pipeline
//!
//! A batch is read eagerly, classified, sorted into dependency order and
//! applied row by row through the resolvers. Read failures and unknown files
//! only affect their own file; a store failure stops the batch.

pub mod classify;
pub mod memory;
pub mod parse;
pub mod reader;
pub mod records;
pub mod resolve;
pub mod store;

use std::time::Instant;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub use classify::{classify, Classification, CsvFileKind};
pub use memory::MemoryStore;
pub use reader::{has_csv_extension, sources_from_dir, CsvSource, CsvTable};
pub use store::{ImportLogStore, ImportStore};

use crate::types::ImportStatus;

/// Warnings kept in the log details; the total is always counted
const MAX_WARNINGS: usize = 200;

/// Per-kind counters and row warnings of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub customers_created: u32,
    pub customers_updated: u32,
    pub devices_created: u32,
    pub devices_updated: u32,
    pub jobs_created: u32,
    pub jobs_updated: u32,
    pub assignments_created: u32,
    pub assignments_updated: u32,
    pub measurements_created: u32,
    pub system_logs_created: u32,
    pub reports_created: u32,
    pub reports_updated: u32,
    pub images_attached: u32,
    pub rows_skipped: u32,
    pub warning_count: u32,
    pub warnings: Vec<String>,
}

impl ImportStats {
    /// Record a row-level warning
    pub fn warn(&mut self, line: usize, message: String) {
        warn!("Line {}: {}", line, message);
        self.warning_count += 1;
        if self.warnings.len() < MAX_WARNINGS {
            self.warnings.push(format!("Zeile {}: {}", line, message));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Imported,
    Failed,
    Skipped,
}

/// Outcome of one file of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub filename: String,
    pub kind: Option<CsvFileKind>,
    pub status: FileStatus,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Terminal result of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub success_count: u32,
    pub error_count: u32,
    pub files: Vec<FileReport>,
    pub stats: ImportStats,
    /// Store failure that stopped the batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl BatchSummary {
    pub fn status(&self) -> ImportStatus {
        if self.fatal_error.is_some() {
            ImportStatus::Error
        } else {
            ImportStatus::Completed
        }
    }

    pub fn message(&self) -> String {
        match &self.fatal_error {
            Some(error) => format!(
                "CSV-Import abgebrochen nach {} erfolgreichen Dateien: {}",
                self.success_count, error
            ),
            None => format!(
                "CSV-Import abgeschlossen: {} erfolgreich, {} Fehler",
                self.success_count, self.error_count
            ),
        }
    }

    pub fn details(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

struct ClassifiedFile {
    filename: String,
    classification: Classification,
    table: CsvTable,
}

/// Import a batch of files against the store
pub async fn run_batch(store: &dyn ImportStore, sources: &[CsvSource]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let mut classified = Vec::new();

    for source in sources {
        let table = match source.read() {
            Ok(table) => table,
            Err(e) => {
                error!("Failed to read {}: {}", source.filename, e);
                summary.error_count += 1;
                summary.files.push(FileReport {
                    filename: source.filename.clone(),
                    kind: None,
                    status: FileStatus::Failed,
                    rows: 0,
                    message: Some(e.to_string()),
                });
                continue;
            }
        };

        match classify(&source.filename, &table.headers) {
            Some(classification) => classified.push(ClassifiedFile {
                filename: source.filename.clone(),
                classification,
                table,
            }),
            None => {
                info!("Unknown file type, skipping: {}", source.filename);
                summary.files.push(FileReport {
                    filename: source.filename.clone(),
                    kind: None,
                    status: FileStatus::Skipped,
                    rows: table.rows.len(),
                    message: Some("Unbekannter Dateityp".to_string()),
                });
            }
        }
    }

    // Stable: files of the same kind keep their upload order
    classified.sort_by_key(|file| file.classification.kind);

    for file in classified {
        let kind = file.classification.kind;
        info!("Importing {} as {} ({} rows)", file.filename, kind, file.table.rows.len());

        match import_file(store, &file.classification, &file.table, &mut summary.stats).await {
            Ok(()) => {
                summary.success_count += 1;
                summary.files.push(FileReport {
                    filename: file.filename,
                    kind: Some(kind),
                    status: FileStatus::Imported,
                    rows: file.table.rows.len(),
                    message: None,
                });
            }
            Err(e) => {
                error!("Store failure while importing {}: {:#}", file.filename, e);
                summary.fatal_error = Some(format!("{}: {:#}", file.filename, e));
                summary.files.push(FileReport {
                    filename: file.filename,
                    kind: Some(kind),
                    status: FileStatus::Failed,
                    rows: file.table.rows.len(),
                    message: Some(format!("{:#}", e)),
                });
                break;
            }
        }
    }

    info!("{}", summary.message());
    summary
}

async fn import_file(
    store: &dyn ImportStore,
    classification: &Classification,
    table: &CsvTable,
    stats: &mut ImportStats,
) -> Result<()> {
    for row in &table.rows {
        match classification.kind {
            CsvFileKind::Customer => resolve::import_customer(store, row, stats).await?,
            CsvFileKind::Device => resolve::import_device(store, row, classification.format, stats).await?,
            CsvFileKind::Job => resolve::import_job(store, row, stats).await?,
            CsvFileKind::Assignment => resolve::import_assignment(store, row, stats).await?,
            CsvFileKind::Measurement => resolve::import_measurement(store, row, stats).await?,
            CsvFileKind::Moisture => records::import_moisture(store, row, stats).await?,
            CsvFileKind::Insulation => records::import_insulation(store, row, stats).await?,
            CsvFileKind::Activity => records::import_activity(store, row, stats).await?,
            CsvFileKind::Report => records::import_report(store, row, stats).await?,
        }
    }
    Ok(())
}

/// Run a batch and move its import log to the terminal status
pub async fn import_and_record(
    store: &dyn ImportStore,
    logs: &dyn ImportLogStore,
    log_id: i64,
    sources: &[CsvSource],
) -> Result<BatchSummary> {
    let start_time = Instant::now();
    let summary = run_batch(store, sources).await;

    let finished = logs
        .finish_import_log(log_id, summary.status(), &summary.message(), &summary.details())
        .await?;
    if !finished {
        warn!("Import log {} was already finished, status left unchanged", log_id);
    }

    info!(
        "Import log {} finished as {} in {}ms",
        log_id,
        summary.status().as_str(),
        start_time.elapsed().as_millis()
    );
    Ok(summary)
}
