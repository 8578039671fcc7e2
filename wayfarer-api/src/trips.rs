use axum::{
    extract::State,
    routing::{delete, get, post},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use wayfarer_core::{CoreError, FilterBuilder, Predicate};
use wayfarer_shared::{time, Budget, BudgetCategory, Destination, Trip, TripItem, TripStatus};

use crate::error::AppError;
use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::middleware::Claims;
use crate::rules::non_negative;
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["name", "description"];
const SORT_FIELDS: &[&str] = &["name", "startDate", "endDate", "status", "updatedAt"];

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/{id}", get(get_trip).put(update_trip).delete(delete_trip))
        .route("/trips/{id}/destinations", post(add_destination))
        .route("/trips/{id}/destinations/{destination_id}", delete(remove_destination))
        .route("/trips/{id}/items", post(add_item))
        .route("/trips/{id}/items/{item_id}", delete(remove_item))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub status: Option<TripStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    #[validate(custom(function = "non_negative"))]
    pub total: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "time::flexible::deserialize")]
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, message = "at least one traveler is required"))]
    pub travelers: u32,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub is_public: bool,
    #[validate(nested)]
    pub budget: BudgetInput,
}

impl TripInput {
    fn check(&self) -> Result<(), AppError> {
        if self.end_date < self.start_date {
            return Err(AppError::validation("endDate", "endDate must not be before startDate"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddDestinationRequest {
    pub destination_id: Uuid,
    #[serde(default, deserialize_with = "time::flexible_option::deserialize")]
    pub arrival_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "time::flexible_option::deserialize")]
    pub departure_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub category: BudgetCategory,
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    pub reference_id: Option<Uuid>,
    #[serde(default, deserialize_with = "time::flexible_option::deserialize")]
    pub date: Option<DateTime<Utc>>,
    #[validate(custom(function = "non_negative"))]
    pub cost: Decimal,
    pub notes: Option<String>,
}

// ============================================================================
// Access
// ============================================================================

/// Trips are private to their owner. Anyone else gets not-found.
async fn owned_trip(state: &AppState, id: Uuid, claims: &Claims) -> Result<Trip, AppError> {
    let trip = state.repo::<Trip>().require(id).await?;
    if trip.user_id != claims.sub {
        return Err(CoreError::not_found("Trip", id).into());
    }
    Ok(trip)
}

async fn save(state: &AppState, mut trip: Trip) -> Result<Trip, AppError> {
    trip.updated_at = Utc::now();
    state.repo::<Trip>().replace(&trip).await?;
    Ok(trip)
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<TripQuery>,
) -> ApiResult<Vec<Trip>> {
    let filter = FilterBuilder::new()
        .require(Predicate::eq("userId", claims.sub.as_str()))
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .eq("status", query.status.map(serde_json::to_value).transpose().map_err(CoreError::from)?)
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Trip>().page(filter, sort, page).await?)
}

/// Public trips are readable by any authenticated user.
async fn get_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Trip> {
    let trip = state.repo::<Trip>().require(id).await?;
    if trip.user_id != claims.sub && !trip.is_public {
        return Err(CoreError::not_found("Trip", id).into());
    }
    ok(trip)
}

async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(input): ValidatedJson<TripInput>,
) -> Created<Trip> {
    input.check()?;

    let now = Utc::now();
    let trip = Trip {
        id: Uuid::new_v4(),
        user_id: claims.sub,
        name: input.name,
        description: input.description,
        start_date: input.start_date,
        end_date: input.end_date,
        travelers: input.travelers,
        status: input.status,
        is_public: input.is_public,
        destinations: Vec::new(),
        accommodations: Vec::new(),
        transportation: Vec::new(),
        activities: Vec::new(),
        meals: Vec::new(),
        other_expenses: Vec::new(),
        budget: Budget::new(input.budget.total, input.budget.currency.to_uppercase()),
        created_at: now,
        updated_at: now,
    };
    state.repo::<Trip>().insert(&trip).await?;

    tracing::info!(id = %trip.id, user = %trip.user_id, "trip created");
    created(trip, "Trip created successfully")
}

/// Replaces the trip's own fields. Stops and items are kept and the budget is re-derived.
async fn update_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<TripInput>,
) -> ApiResult<Trip> {
    input.check()?;
    let mut trip = owned_trip(&state, id, &claims).await?;

    trip.name = input.name;
    trip.description = input.description;
    trip.start_date = input.start_date;
    trip.end_date = input.end_date;
    trip.travelers = input.travelers;
    trip.status = input.status;
    trip.is_public = input.is_public;
    trip.budget.total = input.budget.total;
    trip.budget.currency = input.budget.currency.to_uppercase();
    trip.recompute_budget();

    ok(save(&state, trip).await?)
}

async fn delete_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Option<()>> {
    owned_trip(&state, id, &claims).await?;
    state.repo::<Trip>().delete(id).await?;
    deleted("Trip deleted successfully")
}

async fn add_destination(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<AddDestinationRequest>,
) -> ApiResult<Trip> {
    if let (Some(arrival), Some(departure)) = (input.arrival_date, input.departure_date) {
        if departure < arrival {
            return Err(AppError::validation("departureDate", "departureDate must not be before arrivalDate"));
        }
    }

    let mut trip = owned_trip(&state, id, &claims).await?;
    state.repo::<Destination>().require(input.destination_id).await?;

    if !trip.add_destination(input.destination_id, input.arrival_date, input.departure_date) {
        return Err(CoreError::Duplicate("destination is already part of this trip".to_string()).into());
    }
    ok(save(&state, trip).await?)
}

async fn remove_destination(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((id, destination_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Trip> {
    let mut trip = owned_trip(&state, id, &claims).await?;
    if !trip.remove_destination(destination_id) {
        return Err(CoreError::not_found("Trip destination", destination_id).into());
    }
    ok(save(&state, trip).await?)
}

async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<AddItemRequest>,
) -> ApiResult<Trip> {
    let mut trip = owned_trip(&state, id, &claims).await?;
    trip.add_item(
        input.category,
        TripItem {
            id: Uuid::new_v4(),
            title: input.title,
            reference_id: input.reference_id,
            date: input.date,
            cost: input.cost,
            notes: input.notes,
        },
    );
    ok(save(&state, trip).await?)
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((id, item_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Trip> {
    let mut trip = owned_trip(&state, id, &claims).await?;
    if trip.remove_item(item_id).is_none() {
        return Err(CoreError::not_found("Trip item", item_id).into());
    }
    ok(save(&state, trip).await?)
}
