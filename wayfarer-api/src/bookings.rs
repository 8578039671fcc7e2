use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use wayfarer_booking::{CancelRequest, HotelBookingRequest, VehicleRentalRequest};
use wayfarer_shared::{time, Reservation, ReservationStatus, ResourceKind};

use crate::extract::{created, ok, ok_with_message, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::middleware::Claims;
use crate::state::AppState;

const SORT_FIELDS: &[&str] = &["startDate", "endDate", "status", "price.totalPrice", "updatedAt"];

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_my_bookings))
        .route("/bookings/hotels", post(book_hotel))
        .route("/bookings/vehicles", post(rent_vehicle))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", put(cancel_booking))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/bookings/admin", get(list_all_bookings))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub status: Option<ReservationStatus>,
    pub kind: Option<ResourceKind>,
    /// Admin listing only.
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookHotelRequest {
    pub hotel_id: Uuid,
    pub room_id: Uuid,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub check_in: DateTime<Utc>,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub check_out: DateTime<Utc>,
    #[validate(range(min = 1, max = 20, message = "guests must be between 1 and 20"))]
    pub guests: u32,
    #[validate(length(max = 1000, message = "specialRequests is too long"))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RentVehicleRequest {
    pub vehicle_id: Uuid,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub end_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "insuranceOption must not be empty"))]
    pub insurance_option: Option<String>,
    #[validate(length(max = 1000, message = "specialRequests is too long"))]
    pub special_requests: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> ApiResult<Vec<Reservation>> {
    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(
        state
            .bookings
            .list_reservations(Some(&claims.sub), query.status, query.kind, sort, page)
            .await?,
    )
}

async fn list_all_bookings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> ApiResult<Vec<Reservation>> {
    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(
        state
            .bookings
            .list_reservations(query.user_id.as_deref(), query.status, query.kind, sort, page)
            .await?,
    )
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Reservation> {
    ok(state.bookings.get_reservation(id, &claims.sub, claims.is_admin()).await?)
}

async fn book_hotel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(input): ValidatedJson<BookHotelRequest>,
) -> Created<Reservation> {
    let reservation = state
        .bookings
        .book_room(
            &claims.sub,
            HotelBookingRequest {
                hotel_id: input.hotel_id,
                room_id: input.room_id,
                check_in: input.check_in,
                check_out: input.check_out,
                guests: input.guests,
                special_requests: input.special_requests,
            },
        )
        .await?;

    created(reservation, "Hotel booked successfully")
}

async fn rent_vehicle(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(input): ValidatedJson<RentVehicleRequest>,
) -> Created<Reservation> {
    let reservation = state
        .bookings
        .rent_vehicle(
            &claims.sub,
            VehicleRentalRequest {
                vehicle_id: input.vehicle_id,
                start_date: input.start_date,
                end_date: input.end_date,
                insurance_option: input.insurance_option,
                special_requests: input.special_requests,
            },
        )
        .await?;

    created(reservation, "Vehicle rented successfully")
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Reservation> {
    let reservation = state
        .bookings
        .cancel_reservation(CancelRequest {
            reservation_id: id,
            user_id: claims.sub.clone(),
            is_admin: claims.is_admin(),
        })
        .await?;

    ok_with_message(reservation, "Booking cancelled successfully")
}
