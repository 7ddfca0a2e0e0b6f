//! Customer types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Customer entity
///
/// `external_id` is the reference used by the exporting system (the `UID`
/// column of the customer master, or a contact reference on job rows).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn new(external_id: Option<String>, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id,
            name,
            address: None,
            contact_person: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}
