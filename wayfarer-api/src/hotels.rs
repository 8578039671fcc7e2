use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use wayfarer_booking::RoomAvailability;
use wayfarer_core::{CoreError, FilterBuilder, GeoRadius};
use wayfarer_shared::{Address, DateWindow, Destination, GeoPoint, Hotel, ResourceStatus, Room, SeasonalRate};

use crate::error::AppError;
use crate::extract::{
    created, date_range, deleted, ok, ok_with_message, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created,
    ValidatedJson,
};
use crate::rules::{non_negative, Checks};
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["name", "description", "address.city", "address.country", "amenities"];
const SORT_FIELDS: &[&str] = &["name", "starRating", "pricePerNight", "updatedAt"];

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/hotels/public", get(list_hotels))
        .route("/hotels/public/{id}", get(get_hotel))
        .route("/hotels/public/{id}/availability", get(room_availability))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/hotels/admin", post(create_hotel))
        .route("/hotels/admin/{id}", put(update_hotel).delete(delete_hotel))
        .route("/hotels/admin/{id}/rooms", post(add_room))
        .route("/hotels/admin/{id}/rooms/{room_id}", put(update_room).delete(delete_room))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub destination_id: Option<Uuid>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub amenity: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub guests: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub street: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomInput {
    #[validate(length(min = 1, message = "roomNumber is required"))]
    pub room_number: String,
    #[validate(length(min = 1, message = "roomType is required"))]
    pub room_type: String,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: u32,
    #[validate(custom(function = "non_negative"))]
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

fn default_true() -> bool {
    true
}

impl RoomInput {
    fn check(&self, prefix: &str, checks: &mut Checks) {
        checks
            .seasons(&format!("{}seasonalPricing", prefix), &self.seasonal_pricing)
            .windows(&format!("{}maintenanceWindows", prefix), &self.maintenance_windows);
    }

    fn into_room(self, id: Uuid) -> Room {
        Room {
            id,
            room_number: self.room_number,
            room_type: self.room_type,
            capacity: self.capacity,
            base_price: self.base_price,
            is_available: self.is_available,
            maintenance_status: self.maintenance_status,
            seasonal_pricing: self.seasonal_pricing,
            maintenance_windows: self.maintenance_windows,
            amenities: self.amenities,
        }
    }
}

/// Body for create and full update. On update, `rooms` is ignored; rooms are managed
/// through the room routes.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HotelInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub destination_id: Uuid,
    #[validate(nested)]
    pub address: AddressInput,
    pub location: Option<GeoPoint>,
    #[validate(range(min = 1, max = 5, message = "starRating must be between 1 and 5"))]
    pub star_rating: u8,
    /// Used only while the hotel has no rooms.
    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    pub price_per_night: Decimal,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub rooms: Vec<RoomInput>,
}

impl HotelInput {
    fn check(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks.location("location", self.location.as_ref());
        for (i, room) in self.rooms.iter().enumerate() {
            room.check(&format!("rooms.{}.", i), &mut checks);
            if self.rooms[..i].iter().any(|r| r.room_number == room.room_number) {
                checks.fail(format!("rooms.{}.roomNumber", i), "room numbers must be unique within a hotel");
            }
        }
        checks.finish()
    }

    fn into_hotel(self, id: Uuid, created_at: DateTime<Utc>, rooms: Vec<Room>) -> Hotel {
        let mut hotel = Hotel {
            id,
            name: self.name,
            description: self.description,
            destination_id: self.destination_id,
            address: Address {
                street: self.address.street,
                city: self.address.city,
                country: self.address.country,
            },
            location: self.location,
            star_rating: self.star_rating,
            price_per_night: self.price_per_night,
            amenities: self.amenities,
            images: self.images,
            rooms,
            created_at,
            updated_at: Utc::now(),
        };
        hotel.refresh_price_per_night();
        hotel
    }
}

async fn require_destination(state: &AppState, destination_id: Uuid) -> Result<(), AppError> {
    if !state.repo::<Destination>().exists(destination_id).await? {
        return Err(AppError::validation("destinationId", "destination does not exist"));
    }
    Ok(())
}

// ============================================================================
// Public Handlers
// ============================================================================

async fn list_hotels(State(state): State<AppState>, ApiQuery(query): ApiQuery<HotelQuery>) -> ApiResult<Vec<Hotel>> {
    let geo = GeoRadius::from_params(query.lat, query.lng, query.radius)?;
    let filter = FilterBuilder::new()
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .contains("address.city", query.city.as_deref())
        .contains("address.country", query.country.as_deref())
        .eq("destinationId", query.destination_id.map(|id| id.to_string()))
        .range("pricePerNight", "price", query.min_price, query.max_price)
        .range("starRating", "rating", query.min_rating, None)
        .eq("amenities", query.amenity)
        .near("location", geo)
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Hotel>().page(filter, sort, page).await?)
}

async fn get_hotel(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Hotel> {
    ok(state.repo::<Hotel>().require(id).await?)
}

async fn room_availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<AvailabilityQuery>,
) -> ApiResult<RoomAvailability> {
    let (check_in, check_out) = date_range(
        ("checkIn", query.check_in.as_deref()),
        ("checkOut", query.check_out.as_deref()),
    )?;
    let guests = query.guests.unwrap_or(1);

    ok(state
        .bookings
        .check_room_availability(id, check_in, check_out, guests)
        .await?)
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn create_hotel(
    State(state): State<AppState>,
    ValidatedJson(mut input): ValidatedJson<HotelInput>,
) -> Created<Hotel> {
    input.check()?;
    require_destination(&state, input.destination_id).await?;

    let rooms = std::mem::take(&mut input.rooms)
        .into_iter()
        .map(|room| room.into_room(Uuid::new_v4()))
        .collect();
    let hotel = input.into_hotel(Uuid::new_v4(), Utc::now(), rooms);
    state.repo::<Hotel>().insert(&hotel).await?;

    tracing::info!(id = %hotel.id, rooms = hotel.rooms.len(), "hotel created");
    created(hotel, "Hotel created successfully")
}

async fn update_hotel(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(mut input): ValidatedJson<HotelInput>,
) -> ApiResult<Hotel> {
    input.rooms.clear();
    input.check()?;

    let repo = state.repo::<Hotel>();
    let existing = repo.require(id).await?;
    if existing.destination_id != input.destination_id {
        require_destination(&state, input.destination_id).await?;
    }

    let hotel = input.into_hotel(id, existing.created_at, existing.rooms);
    repo.replace(&hotel).await?;
    ok(hotel)
}

async fn delete_hotel(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Option<()>> {
    state.repo::<Hotel>().delete(id).await?;
    tracing::info!(%id, "hotel deleted");
    deleted("Hotel deleted successfully")
}

async fn add_room(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<RoomInput>,
) -> Created<Hotel> {
    let mut checks = Checks::new();
    input.check("", &mut checks);
    checks.finish()?;

    let repo = state.repo::<Hotel>();
    let mut hotel = repo.require(id).await?;
    if hotel.rooms.iter().any(|r| r.room_number == input.room_number) {
        return Err(CoreError::Duplicate(format!("room {} already exists in this hotel", input.room_number)).into());
    }

    hotel.rooms.push(input.into_room(Uuid::new_v4()));
    hotel.refresh_price_per_night();
    hotel.updated_at = Utc::now();
    repo.replace(&hotel).await?;

    created(hotel, "Room added successfully")
}

async fn update_room(
    State(state): State<AppState>,
    ApiPath((id, room_id)): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(input): ValidatedJson<RoomInput>,
) -> ApiResult<Hotel> {
    let mut checks = Checks::new();
    input.check("", &mut checks);
    checks.finish()?;

    let repo = state.repo::<Hotel>();
    let mut hotel = repo.require(id).await?;
    let position = hotel
        .rooms
        .iter()
        .position(|r| r.id == room_id)
        .ok_or_else(|| CoreError::not_found("Room", room_id))?;
    if hotel
        .rooms
        .iter()
        .any(|r| r.id != room_id && r.room_number == input.room_number)
    {
        return Err(CoreError::Duplicate(format!("room {} already exists in this hotel", input.room_number)).into());
    }

    hotel.rooms[position] = input.into_room(room_id);
    hotel.refresh_price_per_night();
    hotel.updated_at = Utc::now();
    repo.replace(&hotel).await?;

    ok(hotel)
}

async fn delete_room(
    State(state): State<AppState>,
    ApiPath((id, room_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Hotel> {
    let repo = state.repo::<Hotel>();
    let mut hotel = repo.require(id).await?;
    let before = hotel.rooms.len();
    hotel.rooms.retain(|r| r.id != room_id);
    if hotel.rooms.len() == before {
        return Err(CoreError::not_found("Room", room_id).into());
    }

    hotel.refresh_price_per_night();
    hotel.updated_at = Utc::now();
    repo.replace(&hotel).await?;

    ok_with_message(hotel, "Room deleted successfully")
}
