//! Measurement, system log and report types (append-only records)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Device reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: Uuid,
    pub device_id: Uuid,
    pub job_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub energy_consumption: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Free-text record for source data without a normalized column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemLog {
    pub id: Uuid,
    pub level: String,
    pub source: String,
    pub job_id: Option<Uuid>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SystemLog {
    pub fn info(source: &str, job_id: Option<Uuid>, message: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level: "INFO".to_string(),
            source: source.to_string(),
            job_id,
            message,
            timestamp,
            created_at: Utc::now(),
        }
    }
}

/// Job report (image documentation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub job_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub report_type: String,
    pub report_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReportImage {
    pub id: Uuid,
    pub report_id: Uuid,
    pub image_path: String,
    pub caption: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}
