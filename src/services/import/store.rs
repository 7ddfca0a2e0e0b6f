//! Persistence seam of the import pipeline
//!
//! Every call commits on its own; there is no transaction spanning a file.
//! Any `Err` from a store is treated as fatal for the running batch.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::types::{
    Customer, Device, ImportLog, ImportStatus, Job, JobDevice, Measurement, NewImportLog, Report,
    ReportImage, SystemLog,
};

/// Natural-key lookups and writes for the imported entities
#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn find_customer_by_external_id(&self, external_id: &str) -> Result<Option<Customer>>;
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;
    async fn update_customer(&self, customer: &Customer) -> Result<()>;

    async fn find_device_by_serial(&self, serial_number: &str) -> Result<Option<Device>>;
    async fn insert_device(&self, device: &Device) -> Result<()>;
    async fn update_device(&self, device: &Device) -> Result<()>;

    async fn find_job_by_number(&self, job_number: &str) -> Result<Option<Job>>;
    async fn insert_job(&self, job: &Job) -> Result<()>;
    async fn update_job(&self, job: &Job) -> Result<()>;

    async fn find_job_device(&self, job_id: Uuid, device_id: Uuid) -> Result<Option<JobDevice>>;
    async fn insert_job_device(&self, job_device: &JobDevice) -> Result<()>;
    async fn update_job_device(&self, job_device: &JobDevice) -> Result<()>;

    async fn insert_measurement(&self, measurement: &Measurement) -> Result<()>;
    async fn insert_system_log(&self, log: &SystemLog) -> Result<()>;

    async fn find_report(&self, job_id: Uuid, report_date: NaiveDate) -> Result<Option<Report>>;
    async fn insert_report(&self, report: &Report) -> Result<()>;
    async fn update_report(&self, report: &Report) -> Result<()>;
    async fn report_image_exists(&self, report_id: Uuid, image_path: &str) -> Result<bool>;
    async fn insert_report_image(&self, image: &ReportImage) -> Result<()>;
}

/// Durable batch records
#[async_trait]
pub trait ImportLogStore: Send + Sync {
    async fn create_import_log(&self, log: &NewImportLog) -> Result<ImportLog>;

    /// Move a `processing` log to its terminal status.
    ///
    /// Returns false when the log does not exist or is already finished.
    async fn finish_import_log(
        &self,
        id: i64,
        status: ImportStatus,
        message: &str,
        details: &serde_json::Value,
    ) -> Result<bool>;

    /// Newest first
    async fn list_import_logs(&self, limit: i64) -> Result<Vec<ImportLog>>;
    async fn get_import_log(&self, id: i64) -> Result<Option<ImportLog>>;
}
