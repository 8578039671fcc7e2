use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DateWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    HotelRoom,
    Vehicle,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::HotelRoom => "hotel_room",
            ResourceKind::Vehicle => "vehicle",
        }
    }
}

/// Which bookable unit a reservation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub hotel_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

impl ResourceRef {
    pub fn room(hotel_id: Uuid, room_id: Uuid) -> Self {
        Self {
            kind: ResourceKind::HotelRoom,
            hotel_id: Some(hotel_id),
            room_id: Some(room_id),
            vehicle_id: None,
        }
    }

    pub fn vehicle(vehicle_id: Uuid) -> Self {
        Self {
            kind: ResourceKind::Vehicle,
            hotel_id: None,
            room_id: None,
            vehicle_id: Some(vehicle_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub extra: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub reference: String,
    pub user_id: String,
    pub resource: ResourceRef,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub guests: u32,
    pub units: u32,
    pub status: ReservationStatus,
    pub price: PriceBreakdown,
    pub insurance_option: Option<String>,
    pub special_requests: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    pub fn cancel(&mut self) {
        let now = Utc::now();
        self.status = ReservationStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.updated_at = now;
    }
}
