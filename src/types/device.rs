//! Device types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Device entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub serial_number: String,
    pub name: String,
    pub category: String,
    pub status: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub price_per_day: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(serial_number: String, name: String, category: String, status: DeviceStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            serial_number,
            name,
            category,
            status: status.as_str().to_string(),
            location: None,
            description: None,
            price_per_day: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Device status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Available,
    Active,
    Inactive,
    Maintenance,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Available => "available",
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
            DeviceStatus::Maintenance => "maintenance",
        }
    }
}

/// Device categories of the legacy exports that count as drying equipment
pub const DRYING_CATEGORIES: &[&str] = &["dehumidifier", "fan", "heater", "insulation_dryer"];
