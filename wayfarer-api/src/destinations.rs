use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use wayfarer_core::{FilterBuilder, GeoRadius};
use wayfarer_shared::{Destination, GeoPoint};

use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::error::AppError;
use crate::rules::Checks;
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["name", "description", "city", "country", "tags"];
const SORT_FIELDS: &[&str] = &["name", "rating", "city", "country", "updatedAt"];

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/destinations/public", get(list_destinations))
        .route("/destinations/public/{id}", get(get_destination))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/destinations/admin", post(create_destination))
        .route(
            "/destinations/admin/{id}",
            put(update_destination).delete(delete_destination),
        )
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// Body for create and full update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    pub category: Option<String>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "rating must be between 0 and 5"))]
    pub rating: Option<f64>,
    pub best_time_to_visit: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl DestinationInput {
    fn check(&self) -> Result<(), AppError> {
        Checks::new().location("location", self.location.as_ref()).finish()
    }

    fn into_destination(self, id: Uuid, created_at: DateTime<Utc>) -> Destination {
        Destination {
            id,
            name: self.name,
            description: self.description,
            city: self.city,
            country: self.country,
            category: self.category,
            location: self.location,
            images: self.images,
            tags: self.tags,
            rating: self.rating,
            best_time_to_visit: self.best_time_to_visit,
            is_featured: self.is_featured,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_destinations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DestinationQuery>,
) -> ApiResult<Vec<Destination>> {
    let geo = GeoRadius::from_params(query.lat, query.lng, query.radius)?;
    let filter = FilterBuilder::new()
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .contains("city", query.city.as_deref())
        .contains("country", query.country.as_deref())
        .eq("category", query.category)
        .eq("isFeatured", query.featured)
        .near("location", geo)
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Destination>().page(filter, sort, page).await?)
}

async fn get_destination(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Destination> {
    ok(state.repo::<Destination>().require(id).await?)
}

async fn create_destination(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<DestinationInput>,
) -> Created<Destination> {
    input.check()?;
    let destination = input.into_destination(Uuid::new_v4(), Utc::now());
    state.repo::<Destination>().insert(&destination).await?;

    tracing::info!(id = %destination.id, name = %destination.name, "destination created");
    created(destination, "Destination created successfully")
}

async fn update_destination(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<DestinationInput>,
) -> ApiResult<Destination> {
    input.check()?;
    let repo = state.repo::<Destination>();
    let existing = repo.require(id).await?;

    let destination = input.into_destination(id, existing.created_at);
    repo.replace(&destination).await?;
    ok(destination)
}

async fn delete_destination(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Option<()>> {
    state.repo::<Destination>().delete(id).await?;
    tracing::info!(%id, "destination deleted");
    deleted("Destination deleted successfully")
}
