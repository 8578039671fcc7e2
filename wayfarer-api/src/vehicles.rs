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
use wayfarer_booking::VehicleAvailability;
use wayfarer_core::{FilterBuilder, GeoRadius};
use wayfarer_shared::{DateWindow, GeoPoint, InsuranceOption, ResourceStatus, Vehicle};

use crate::error::AppError;
use crate::extract::{
    created, date_range, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson,
};
use crate::rules::{non_negative, Checks};
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["make", "model", "category", "city", "features"];
const SORT_FIELDS: &[&str] = &["make", "model", "year", "dailyRate", "capacity", "updatedAt"];

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles/public", get(list_vehicles))
        .route("/vehicles/public/{id}", get(get_vehicle))
        .route("/vehicles/public/{id}/availability", get(vehicle_availability))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles/admin", post(create_vehicle))
        .route("/vehicles/admin/{id}", put(update_vehicle).delete(delete_vehicle))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_capacity: Option<f64>,
    pub is_available: Option<bool>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalWindowQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceInput {
    #[validate(length(min = 1, message = "insurance name is required"))]
    pub name: String,
    #[validate(custom(function = "non_negative"))]
    pub daily_rate: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VehicleInput {
    #[validate(length(min = 1, max = 60, message = "make is required"))]
    pub make: String,
    #[validate(length(min = 1, max = 60, message = "model is required"))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100, message = "year is out of range"))]
    pub year: u16,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: u32,
    #[validate(custom(function = "non_negative"))]
    pub daily_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub status: ResourceStatus,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub insurance_options: Vec<InsuranceInput>,
    #[serde(default)]
    pub maintenance_windows: Vec<DateWindow>,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl VehicleInput {
    fn check(&self) -> Result<(), AppError> {
        let mut checks = Checks::new();
        checks
            .location("location", self.location.as_ref())
            .windows("maintenanceWindows", &self.maintenance_windows);
        for (i, option) in self.insurance_options.iter().enumerate() {
            if self.insurance_options[..i]
                .iter()
                .any(|o| o.name.eq_ignore_ascii_case(&option.name))
            {
                checks.fail(format!("insuranceOptions.{}.name", i), "insurance option names must be unique");
            }
        }
        checks.finish()
    }

    fn into_vehicle(self, id: Uuid, created_at: DateTime<Utc>) -> Vehicle {
        Vehicle {
            id,
            make: self.make,
            model: self.model,
            year: self.year,
            category: self.category,
            capacity: self.capacity,
            daily_rate: self.daily_rate,
            is_available: self.is_available,
            status: self.status,
            city: self.city,
            location: self.location,
            features: self.features,
            insurance_options: self
                .insurance_options
                .into_iter()
                .map(|o| InsuranceOption {
                    name: o.name,
                    daily_rate: o.daily_rate,
                    description: o.description,
                })
                .collect(),
            maintenance_windows: self.maintenance_windows,
            images: self.images,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Public Handlers
// ============================================================================

async fn list_vehicles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<VehicleQuery>,
) -> ApiResult<Vec<Vehicle>> {
    let geo = GeoRadius::from_params(query.lat, query.lng, query.radius)?;
    let filter = FilterBuilder::new()
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .eq("category", query.category)
        .contains("city", query.city.as_deref())
        .range("dailyRate", "price", query.min_price, query.max_price)
        .range("capacity", "capacity", query.min_capacity, None)
        .eq("isAvailable", query.is_available)
        .near("location", geo)
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Vehicle>().page(filter, sort, page).await?)
}

async fn get_vehicle(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Vehicle> {
    ok(state.repo::<Vehicle>().require(id).await?)
}

async fn vehicle_availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<RentalWindowQuery>,
) -> ApiResult<VehicleAvailability> {
    let (start_date, end_date) = date_range(
        ("startDate", query.start_date.as_deref()),
        ("endDate", query.end_date.as_deref()),
    )?;

    ok(state
        .bookings
        .check_vehicle_availability(id, start_date, end_date)
        .await?)
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn create_vehicle(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<VehicleInput>,
) -> Created<Vehicle> {
    input.check()?;
    let vehicle = input.into_vehicle(Uuid::new_v4(), Utc::now());
    state.repo::<Vehicle>().insert(&vehicle).await?;

    tracing::info!(id = %vehicle.id, make = %vehicle.make, model = %vehicle.model, "vehicle created");
    created(vehicle, "Vehicle created successfully")
}

async fn update_vehicle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<VehicleInput>,
) -> ApiResult<Vehicle> {
    input.check()?;
    let repo = state.repo::<Vehicle>();
    let existing = repo.require(id).await?;

    let vehicle = input.into_vehicle(id, existing.created_at);
    repo.replace(&vehicle).await?;
    ok(vehicle)
}

async fn delete_vehicle(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Option<()>> {
    state.repo::<Vehicle>().delete(id).await?;
    tracing::info!(%id, "vehicle deleted");
    deleted("Vehicle deleted successfully")
}
