//! Dashboard statistics types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatsRequest {
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTypeCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Jobs created in range
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub completed_jobs: i64,
    /// Active jobs with at least one drying device assigned
    pub drying_jobs: i64,
    pub total_devices: i64,
    pub active_devices: i64,
    pub devices_by_type: Vec<DeviceTypeCount>,
}
