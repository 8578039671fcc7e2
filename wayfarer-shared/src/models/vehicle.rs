use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DateWindow, GeoPoint, ResourceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub category: String,
    pub capacity: u32,
    pub daily_rate: Decimal,
    pub is_available: bool,
    #[serde(default)]
    pub status: ResourceStatus,
    pub city: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub insurance_options: Vec<InsuranceOption>,
    #[serde(default)]
    pub maintenance_windows: Vec<DateWindow>,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn insurance(&self, name: &str) -> Option<&InsuranceOption> {
        self.insurance_options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceOption {
    pub name: String,
    pub daily_rate: Decimal,
    pub description: Option<String>,
}
