use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use wayfarer_catalog::availability::{self, AvailabilityRequest};
use wayfarer_catalog::pricing::billable_units;
use wayfarer_catalog::{PricingEngine, RoomQuote};
use wayfarer_core::{
    CoreError, CoreResult, DocumentStore, FieldError, FindQuery, Page, PageRequest, Predicate, Repository, Sort, WriteBatch,
};
use wayfarer_shared::{
    DateWindow, Hotel, Notification, NotificationKind, PriceBreakdown, Reservation, ReservationStatus, ResourceKind,
    ResourceRef, Room, Vehicle,
};

use crate::reference::{generate_reference, ReferenceKind};

// ============================================================================
// Requests and results
// ============================================================================

#[derive(Debug, Clone)]
pub struct HotelBookingRequest {
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VehicleRentalRequest {
    pub vehicle_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub insurance_option: Option<String>,
    pub special_requests: Option<String>,
}

/// Who is cancelling. Admins may cancel any reservation.
#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub reservation_id: Uuid,
    pub user_id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableRoom {
    pub room: Room,
    pub calculated_price: RoomQuote,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub hotel_id: Uuid,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub guests: u32,
    pub nights: u32,
    pub available_rooms: Vec<AvailableRoom>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleAvailability {
    pub vehicle_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days: u32,
    pub is_available: bool,
    /// Why the vehicle cannot be rented, when it cannot.
    pub reason: Option<String>,
    /// Price without insurance. Present only when available.
    pub price: Option<PriceBreakdown>,
}

// ============================================================================
// Service
// ============================================================================

/// Availability, pricing and reservation writes for rooms and vehicles.
pub struct BookingService {
    store: Arc<dyn DocumentStore>,
    hotels: Repository<Hotel>,
    vehicles: Repository<Vehicle>,
    reservations: Repository<Reservation>,
    pricing: PricingEngine,
}

impl BookingService {
    pub fn new(store: Arc<dyn DocumentStore>, pricing: PricingEngine) -> Self {
        Self {
            hotels: Repository::new(store.clone()),
            vehicles: Repository::new(store.clone()),
            reservations: Repository::new(store.clone()),
            store,
            pricing,
        }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Every room of the hotel that can take `guests` for the whole window, with its quote.
    pub async fn check_room_availability(
        &self,
        hotel_id: Uuid,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        guests: u32,
    ) -> CoreResult<RoomAvailability> {
        let window = validate_window(check_in, check_out, "checkOut")?;
        validate_guests(guests)?;

        let hotel = self.hotels.require(hotel_id).await?;
        let booked = self
            .reservations
            .find(&FindQuery::new(active_on("resource.hotelId", hotel_id)))
            .await?;

        let request = AvailabilityRequest { window, guests };
        let available_rooms = hotel
            .rooms
            .iter()
            .filter(|room| {
                let held: Vec<Reservation> = booked
                    .iter()
                    .filter(|r| r.resource.room_id == Some(room.id))
                    .cloned()
                    .collect();
                availability::is_available(*room, &request, &held)
            })
            .map(|room| AvailableRoom {
                room: room.clone(),
                calculated_price: self.pricing.quote_room(room, &window),
            })
            .collect();

        Ok(RoomAvailability {
            hotel_id,
            check_in,
            check_out,
            guests,
            nights: billable_units(&window),
            available_rooms,
        })
    }

    pub async fn book_room(&self, user_id: &str, request: HotelBookingRequest) -> CoreResult<Reservation> {
        // 1. Validate input
        let window = validate_window(request.check_in, request.check_out, "checkOut")?;
        validate_guests(request.guests)?;

        // 2. Load hotel and room
        let hotel = self.hotels.require(request.hotel_id).await?;
        let room = hotel
            .room(request.room_id)
            .ok_or_else(|| CoreError::not_found("Room", request.room_id))?;

        // 3. Availability
        let held = self
            .reservations
            .find(&FindQuery::new(active_on("resource.roomId", room.id)))
            .await?;
        let availability_request = AvailabilityRequest {
            window,
            guests: request.guests,
        };
        availability::check(room, &availability_request, &held)
            .map_err(|reason| CoreError::NotAvailable(format!("Room {}: {}", room.room_number, reason)))?;

        // 4. Price and reference
        let price = self.pricing.price_room_booking(room, &window);
        let reservation = new_reservation(
            generate_reference(ReferenceKind::Hotel),
            user_id,
            ResourceRef::room(hotel.id, room.id),
            window,
            request.guests,
            price,
            None,
            request.special_requests,
        );

        // 5. Commit reservation and notification together
        let notification = Notification::new(
            user_id.to_string(),
            NotificationKind::Booking,
            "Hotel booking confirmed".to_string(),
            format!(
                "Your stay at {} (room {}) is confirmed. Reference {}.",
                hotel.name, room.room_number, reservation.reference
            ),
        )
        .with_link(format!("/bookings/{}", reservation.id));

        let mut batch = WriteBatch::new();
        batch.insert(&reservation)?.insert(&notification)?;
        self.store.commit(batch).await?;

        tracing::info!(
            reference = %reservation.reference,
            hotel_id = %hotel.id,
            room_id = %room.id,
            total = %reservation.price.total_price,
            "hotel room booked"
        );
        Ok(reservation)
    }

    pub async fn check_vehicle_availability(
        &self,
        vehicle_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> CoreResult<VehicleAvailability> {
        let window = validate_window(start_date, end_date, "endDate")?;
        let vehicle = self.vehicles.require(vehicle_id).await?;
        let held = self
            .reservations
            .find(&FindQuery::new(active_on("resource.vehicleId", vehicle_id)))
            .await?;

        let request = AvailabilityRequest { window, guests: 1 };
        let outcome = availability::check(&vehicle, &request, &held);

        Ok(VehicleAvailability {
            vehicle_id,
            start_date,
            end_date,
            days: billable_units(&window),
            is_available: outcome.is_ok(),
            reason: outcome.as_ref().err().map(ToString::to_string),
            price: outcome
                .is_ok()
                .then(|| self.pricing.price_vehicle_rental(&vehicle, &window, None)),
        })
    }

    pub async fn rent_vehicle(&self, user_id: &str, request: VehicleRentalRequest) -> CoreResult<Reservation> {
        // 1. Validate input
        let window = validate_window(request.start_date, request.end_date, "endDate")?;

        // 2. Load vehicle and resolve insurance
        let mut vehicle = self.vehicles.require(request.vehicle_id).await?;
        let insurance = match request.insurance_option.as_deref() {
            Some(name) => Some(vehicle.insurance(name).cloned().ok_or_else(|| {
                CoreError::validation("insuranceOption", format!("unknown insurance option '{}'", name))
            })?),
            None => None,
        };

        // 3. Availability
        let held = self
            .reservations
            .find(&FindQuery::new(active_on("resource.vehicleId", vehicle.id)))
            .await?;
        availability::check(&vehicle, &AvailabilityRequest { window, guests: 1 }, &held).map_err(|reason| {
            CoreError::NotAvailable(format!("{} {}: {}", vehicle.make, vehicle.model, reason))
        })?;

        // 4. Price and reference
        let price = self.pricing.price_vehicle_rental(&vehicle, &window, insurance.as_ref());
        let reservation = new_reservation(
            generate_reference(ReferenceKind::Vehicle),
            user_id,
            ResourceRef::vehicle(vehicle.id),
            window,
            1,
            price,
            insurance.map(|o| o.name),
            request.special_requests,
        );

        // 5. Take the vehicle off the market and commit everything together
        vehicle.is_available = false;
        vehicle.updated_at = Utc::now();

        let notification = Notification::new(
            user_id.to_string(),
            NotificationKind::Booking,
            "Vehicle rental confirmed".to_string(),
            format!(
                "Your {} {} rental is confirmed. Reference {}.",
                vehicle.make, vehicle.model, reservation.reference
            ),
        )
        .with_link(format!("/bookings/{}", reservation.id));

        let mut batch = WriteBatch::new();
        batch
            .insert(&reservation)?
            .replace(&vehicle)?
            .insert(&notification)?;
        self.store.commit(batch).await?;

        tracing::info!(
            reference = %reservation.reference,
            vehicle_id = %vehicle.id,
            total = %reservation.price.total_price,
            "vehicle rented"
        );
        Ok(reservation)
    }

    /// Cancel a confirmed reservation. A rented vehicle goes back on the market.
    pub async fn cancel_reservation(&self, request: CancelRequest) -> CoreResult<Reservation> {
        let mut reservation = self
            .get_reservation(request.reservation_id, &request.user_id, request.is_admin)
            .await?;

        if reservation.status == ReservationStatus::Cancelled {
            return Err(CoreError::validation("status", "reservation is already cancelled"));
        }

        reservation.cancel();
        let mut batch = WriteBatch::new();
        batch.replace(&reservation)?;

        if let (ResourceKind::Vehicle, Some(vehicle_id)) = (reservation.resource.kind, reservation.resource.vehicle_id) {
            match self.vehicles.get(vehicle_id).await? {
                Some(mut vehicle) => {
                    vehicle.is_available = true;
                    vehicle.updated_at = Utc::now();
                    batch.replace(&vehicle)?;
                }
                None => tracing::warn!(%vehicle_id, "cancelled rental for a vehicle that no longer exists"),
            }
        }

        let notification = Notification::new(
            reservation.user_id.clone(),
            NotificationKind::Booking,
            "Booking cancelled".to_string(),
            format!("Reservation {} has been cancelled.", reservation.reference),
        )
        .with_link(format!("/bookings/{}", reservation.id));
        batch.insert(&notification)?;

        self.store.commit(batch).await?;

        tracing::info!(reference = %reservation.reference, by = %request.user_id, "reservation cancelled");
        Ok(reservation)
    }

    /// Owners see their own reservations, admins see all. Anything else is not found.
    pub async fn get_reservation(&self, id: Uuid, user_id: &str, is_admin: bool) -> CoreResult<Reservation> {
        let reservation = self.reservations.require(id).await?;
        if !is_admin && reservation.user_id != user_id {
            return Err(CoreError::not_found("Reservation", id));
        }
        Ok(reservation)
    }

    /// `owner = None` lists every user's reservations.
    pub async fn list_reservations(
        &self,
        owner: Option<&str>,
        status: Option<ReservationStatus>,
        kind: Option<ResourceKind>,
        sort: Sort,
        page: PageRequest,
    ) -> CoreResult<Page<Reservation>> {
        let mut filter = Predicate::All;
        if let Some(owner) = owner {
            filter = filter.and(Predicate::eq("userId", owner));
        }
        if let Some(status) = status {
            filter = filter.and(Predicate::eq("status", serde_json::to_value(status)?));
        }
        if let Some(kind) = kind {
            filter = filter.and(Predicate::eq("resource.kind", kind.as_str()));
        }
        self.reservations.page(filter, sort, page).await
    }
}

/// Confirmed reservations whose resource field `field` equals `id`.
fn active_on(field: &str, id: Uuid) -> Predicate {
    Predicate::eq(field, id.to_string()).and(Predicate::eq("status", "Confirmed"))
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>, end_path: &str) -> CoreResult<DateWindow> {
    let window = DateWindow::new(start, end);
    if !window.is_well_formed() {
        return Err(CoreError::Validation(vec![FieldError::field(
            end_path,
            "end date must be after start date",
        )]));
    }
    Ok(window)
}

fn validate_guests(guests: u32) -> CoreResult<()> {
    if guests < 1 {
        return Err(CoreError::validation("guests", "at least one guest is required"));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn new_reservation(
    reference: String,
    user_id: &str,
    resource: ResourceRef,
    window: DateWindow,
    guests: u32,
    price: PriceBreakdown,
    insurance_option: Option<String>,
    special_requests: Option<String>,
) -> Reservation {
    let now = Utc::now();
    Reservation {
        id: Uuid::new_v4(),
        reference,
        user_id: user_id.to_string(),
        resource,
        start_date: window.start,
        end_date: window.end,
        guests,
        units: billable_units(&window),
        status: ReservationStatus::Confirmed,
        price,
        insurance_option,
        special_requests,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    }
}
