//! Job (drying order) and device assignment types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Job entity, keyed by the order number of the source system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub job_number: String,
    pub customer_id: Option<Uuid>,
    pub description: Option<String>,
    pub status: String,
    pub address: Option<String>,
    pub insurance_number: Option<String>,
    pub damage_type: Option<String>,
    pub rooms: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(job_number: String, customer_id: Option<Uuid>, status: JobStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_number,
            customer_id,
            description: None,
            status: status.as_str().to_string(),
            address: None,
            insurance_number: None,
            damage_type: None,
            rooms: None,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Canonical job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Active,
    Completed,
    Canceled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Map the status vocabulary of the exports (case-insensitive)
    pub fn from_source(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aktiv" | "in bearbeitung" => Some(JobStatus::Active),
            "abgeschlossen" => Some(JobStatus::Completed),
            "offen" => Some(JobStatus::Pending),
            "storniert" => Some(JobStatus::Canceled),
            _ => None,
        }
    }
}

/// Deployment of a device at a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobDevice {
    pub id: Uuid,
    pub job_id: Uuid,
    pub device_id: Uuid,
    pub installation_date: Option<NaiveDate>,
    pub removal_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub status: String,
    pub initial_reading: Option<f64>,
    pub final_reading: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobDevice {
    pub fn new(job_id: Uuid, device_id: Uuid, status: AssignmentStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            device_id,
            installation_date: None,
            removal_date: None,
            location: None,
            status: status.as_str().to_string(),
            initial_reading: None,
            final_reading: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Kind of a device location change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Installation,
    Removal,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Installation => "installation",
            AssignmentStatus::Removal => "removal",
        }
    }

    /// `Art` column: "Demontage" (or "removal") marks a removal, anything else an installation
    pub fn from_source(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "demontage" || v == "removal" => AssignmentStatus::Removal,
            _ => AssignmentStatus::Installation,
        }
    }
}
