//! In-memory store used for dry runs and tests

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::store::{ImportLogStore, ImportStore};
use crate::types::{
    Customer, Device, ImportLog, ImportStatus, Job, JobDevice, Measurement, NewImportLog, Report,
    ReportImage, SystemLog,
};

/// Everything the store holds, cloneable for assertions
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub customers: Vec<Customer>,
    pub devices: Vec<Device>,
    pub jobs: Vec<Job>,
    pub job_devices: Vec<JobDevice>,
    pub measurements: Vec<Measurement>,
    pub system_logs: Vec<SystemLog>,
    pub reports: Vec<Report>,
    pub report_images: Vec<ReportImage>,
    pub import_logs: Vec<ImportLog>,
    /// Number of update calls on existing entities
    pub update_count: usize,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MemoryState {
        self.state.lock().clone()
    }

    /// Make every following call fail, like a dropped database connection
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }
}

fn replace<T>(items: &mut [T], item: &T, same: impl Fn(&T) -> bool) -> Result<()>
where
    T: Clone,
{
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => {
            *existing = item.clone();
            Ok(())
        }
        None => bail!("record not found"),
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn find_customer_by_external_id(&self, external_id: &str) -> Result<Option<Customer>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .customers
            .iter()
            .find(|c| c.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<()> {
        self.check_available()?;
        self.state.lock().customers.push(customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.update_count += 1;
        replace(&mut state.customers, customer, |c| c.id == customer.id)
    }

    async fn find_device_by_serial(&self, serial_number: &str) -> Result<Option<Device>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .devices
            .iter()
            .find(|d| d.serial_number == serial_number)
            .cloned())
    }

    async fn insert_device(&self, device: &Device) -> Result<()> {
        self.check_available()?;
        self.state.lock().devices.push(device.clone());
        Ok(())
    }

    async fn update_device(&self, device: &Device) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.update_count += 1;
        replace(&mut state.devices, device, |d| d.id == device.id)
    }

    async fn find_job_by_number(&self, job_number: &str) -> Result<Option<Job>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state.jobs.iter().find(|j| j.job_number == job_number).cloned())
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        self.check_available()?;
        self.state.lock().jobs.push(job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.update_count += 1;
        replace(&mut state.jobs, job, |j| j.id == job.id)
    }

    async fn find_job_device(&self, job_id: Uuid, device_id: Uuid) -> Result<Option<JobDevice>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .job_devices
            .iter()
            .find(|jd| jd.job_id == job_id && jd.device_id == device_id)
            .cloned())
    }

    async fn insert_job_device(&self, job_device: &JobDevice) -> Result<()> {
        self.check_available()?;
        self.state.lock().job_devices.push(job_device.clone());
        Ok(())
    }

    async fn update_job_device(&self, job_device: &JobDevice) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.update_count += 1;
        replace(&mut state.job_devices, job_device, |jd| jd.id == job_device.id)
    }

    async fn insert_measurement(&self, measurement: &Measurement) -> Result<()> {
        self.check_available()?;
        self.state.lock().measurements.push(measurement.clone());
        Ok(())
    }

    async fn insert_system_log(&self, log: &SystemLog) -> Result<()> {
        self.check_available()?;
        self.state.lock().system_logs.push(log.clone());
        Ok(())
    }

    async fn find_report(&self, job_id: Uuid, report_date: NaiveDate) -> Result<Option<Report>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .reports
            .iter()
            .find(|r| r.job_id == job_id && r.report_date == report_date)
            .cloned())
    }

    async fn insert_report(&self, report: &Report) -> Result<()> {
        self.check_available()?;
        self.state.lock().reports.push(report.clone());
        Ok(())
    }

    async fn update_report(&self, report: &Report) -> Result<()> {
        self.check_available()?;
        let mut state = self.state.lock();
        state.update_count += 1;
        replace(&mut state.reports, report, |r| r.id == report.id)
    }

    async fn report_image_exists(&self, report_id: Uuid, image_path: &str) -> Result<bool> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state
            .report_images
            .iter()
            .any(|i| i.report_id == report_id && i.image_path == image_path))
    }

    async fn insert_report_image(&self, image: &ReportImage) -> Result<()> {
        self.check_available()?;
        self.state.lock().report_images.push(image.clone());
        Ok(())
    }
}

#[async_trait]
impl ImportLogStore for MemoryStore {
    async fn create_import_log(&self, log: &NewImportLog) -> Result<ImportLog> {
        self.check_available()?;
        let mut state = self.state.lock();
        let id = state.import_logs.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        let record = ImportLog {
            id,
            filename: log.filename.clone(),
            stored_path: log.stored_path.clone(),
            status: ImportStatus::Processing.as_str().to_string(),
            message: Some(log.message.clone()),
            import_type: log.import_type.as_str().to_string(),
            details: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.import_logs.push(record.clone());
        Ok(record)
    }

    async fn finish_import_log(
        &self,
        id: i64,
        status: ImportStatus,
        message: &str,
        details: &serde_json::Value,
    ) -> Result<bool> {
        self.check_available()?;
        let mut state = self.state.lock();
        let log = state
            .import_logs
            .iter_mut()
            .find(|l| l.id == id && l.status == ImportStatus::Processing.as_str());
        match log {
            Some(log) => {
                log.status = status.as_str().to_string();
                log.message = Some(message.to_string());
                log.details = Some(details.clone());
                log.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_import_logs(&self, limit: i64) -> Result<Vec<ImportLog>> {
        self.check_available()?;
        let state = self.state.lock();
        let mut logs = state.import_logs.clone();
        logs.sort_by(|a, b| b.id.cmp(&a.id));
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }

    async fn get_import_log(&self, id: i64) -> Result<Option<ImportLog>> {
        self.check_available()?;
        let state = self.state.lock();
        Ok(state.import_logs.iter().find(|l| l.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImportType;

    fn new_log(name: &str) -> NewImportLog {
        NewImportLog {
            filename: name.to_string(),
            stored_path: None,
            import_type: ImportType::Single,
            message: "in Verarbeitung".to_string(),
        }
    }

    #[tokio::test]
    async fn test_log_ids_increase_and_list_newest_first() {
        let store = MemoryStore::new();
        let first = store.create_import_log(&new_log("a.csv")).await.unwrap();
        let second = store.create_import_log(&new_log("b.csv")).await.unwrap();
        assert!(second.id > first.id);

        let logs = store.list_import_logs(10).await.unwrap();
        assert_eq!(logs[0].id, second.id);
        assert_eq!(store.list_import_logs(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_finish_import_log_only_once() {
        let store = MemoryStore::new();
        let log = store.create_import_log(&new_log("a.csv")).await.unwrap();
        let details = serde_json::json!({"successCount": 1});

        assert!(store
            .finish_import_log(log.id, ImportStatus::Completed, "ok", &details)
            .await
            .unwrap());
        assert!(!store
            .finish_import_log(log.id, ImportStatus::Error, "late", &details)
            .await
            .unwrap());

        let stored = store.get_import_log(log.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "completed");
        assert_eq!(stored.message.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.find_job_by_number("A-1").await.is_err());
    }
}
