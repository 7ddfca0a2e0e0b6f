//! PostgreSQL implementation of the import stores

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::queries;
use crate::services::import::{ImportLogStore, ImportStore};
use crate::types::{
    Customer, Device, ImportLog, ImportStatus, Job, JobDevice, Measurement, NewImportLog, Report,
    ReportImage, SystemLog,
};

/// Store backed by the worker's connection pool. Every write commits on its own.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ImportStore for PgStore {
    async fn find_customer_by_external_id(&self, external_id: &str) -> Result<Option<Customer>> {
        queries::customer::find_by_external_id(&self.pool, external_id).await
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        queries::customer::insert_customer(&self.pool, customer).await
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        queries::customer::update_customer(&self.pool, customer).await
    }

    async fn find_device_by_serial(&self, serial_number: &str) -> Result<Option<Device>> {
        queries::device::find_by_serial(&self.pool, serial_number).await
    }

    async fn insert_device(&self, device: &Device) -> Result<()> {
        queries::device::insert_device(&self.pool, device).await
    }

    async fn update_device(&self, device: &Device) -> Result<()> {
        queries::device::update_device(&self.pool, device).await
    }

    async fn find_job_by_number(&self, job_number: &str) -> Result<Option<Job>> {
        queries::job::find_by_number(&self.pool, job_number).await
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        queries::job::insert_job(&self.pool, job).await
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        queries::job::update_job(&self.pool, job).await
    }

    async fn find_job_device(&self, job_id: Uuid, device_id: Uuid) -> Result<Option<JobDevice>> {
        queries::job::find_job_device(&self.pool, job_id, device_id).await
    }

    async fn insert_job_device(&self, job_device: &JobDevice) -> Result<()> {
        queries::job::insert_job_device(&self.pool, job_device).await
    }

    async fn update_job_device(&self, job_device: &JobDevice) -> Result<()> {
        queries::job::update_job_device(&self.pool, job_device).await
    }

    async fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        queries::measurement::insert_measurement(&self.pool, measurement).await
    }

    async fn insert_system_log(&self, log: &SystemLog) -> Result<()> {
        queries::measurement::insert_system_log(&self.pool, log).await
    }

    async fn find_report(&self, job_id: Uuid, report_date: NaiveDate) -> Result<Option<Report>> {
        queries::report::find_report(&self.pool, job_id, report_date).await
    }

    async fn insert_report(&self, report: &Report) -> Result<()> {
        queries::report::insert_report(&self.pool, report).await
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        queries::report::update_report(&self.pool, report).await
    }

    async fn report_image_exists(&self, report_id: Uuid, image_path: &str) -> Result<bool> {
        queries::report::image_exists(&self.pool, report_id, image_path).await
    }

    async fn insert_report_image(&self, image: &ReportImage) -> Result<()> {
        queries::report::insert_image(&self.pool, image).await
    }
}

#[async_trait]
impl ImportLogStore for PgStore {
    async fn create_import_log(&self, log: &NewImportLog) -> Result<ImportLog> {
        queries::import_log::create_import_log(&self.pool, log).await
    }

    async fn finish_import_log(
        &self,
        id: i64,
        status: ImportStatus,
        message: &str,
        details: &serde_json::Value,
    ) -> Result<bool> {
        queries::import_log::finish_import_log(&self.pool, id, status, message, details).await
    }

    async fn list_import_logs(&self, limit: i64) -> Result<Vec<ImportLog>> {
        queries::import_log::list_import_logs(&self.pool, limit).await
    }

    async fn get_import_log(&self, id: i64) -> Result<Option<ImportLog>> {
        queries::import_log::get_import_log(&self.pool, id).await
    }
}
