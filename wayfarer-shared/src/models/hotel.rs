use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Address, DateWindow, GeoPoint, ResourceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub destination_id: Uuid,
    pub address: Address,
    pub location: Option<GeoPoint>,
    pub star_rating: u8,
    /// Cheapest advertised nightly rate, kept in sync with `rooms`.
    pub price_per_night: Decimal,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hotel {
    pub fn room(&self, room_id: Uuid) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    /// Recompute the advertised rate from the cheapest room, if any.
    pub fn refresh_price_per_night(&mut self) {
        if let Some(min) = self.rooms.iter().map(|r| r.base_price).min() {
            self.price_per_night = min;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,
    pub room_number: String,
    pub room_type: String,
    pub capacity: u32,
    pub base_price: Decimal,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub maintenance_status: ResourceStatus,
    #[serde(default)]
    pub seasonal_pricing: Vec<SeasonalRate>,
    #[serde(default)]
    pub maintenance_windows: Vec<DateWindow>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// Rate multiplier applied when check-in falls inside `[start_date, end_date]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalRate {
    pub name: String,
    #[serde(deserialize_with = "crate::time::flexible::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "crate::time::flexible::deserialize")]
    pub end_date: DateTime<Utc>,
    pub multiplier: Decimal,
}

fn default_true() -> bool {
    true
}
