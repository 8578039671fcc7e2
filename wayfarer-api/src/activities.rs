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
use wayfarer_core::{CoreError, FilterBuilder, GeoRadius, Predicate};
use wayfarer_shared::{Activity, Destination, GeoPoint};

use crate::error::AppError;
use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::rules::{non_negative, Checks};
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["name", "description", "category"];
const SORT_FIELDS: &[&str] = &["name", "price", "durationHours", "updatedAt"];

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/activities/public", get(list_activities))
        .route("/activities/public/{id}", get(get_activity))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/activities/admin", post(create_activity))
        .route("/activities/admin/{id}", put(update_activity).delete(delete_activity))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub destination_id: Option<Uuid>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub destination_id: Uuid,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,
    #[validate(range(exclusive_min = 0.0, message = "durationHours must be positive"))]
    pub duration_hours: f64,
    #[validate(range(min = 1, message = "maxParticipants must be at least 1"))]
    pub max_participants: u32,
    pub difficulty: Option<String>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl ActivityInput {
    async fn check(&self, state: &AppState) -> Result<(), AppError> {
        Checks::new().location("location", self.location.as_ref()).finish()?;
        if !state.repo::<Destination>().exists(self.destination_id).await? {
            return Err(AppError::validation("destinationId", "destination does not exist"));
        }
        Ok(())
    }

    fn into_activity(self, id: Uuid, created_at: DateTime<Utc>) -> Activity {
        Activity {
            id,
            name: self.name,
            description: self.description,
            destination_id: self.destination_id,
            category: self.category,
            price: self.price,
            duration_hours: self.duration_hours,
            max_participants: self.max_participants,
            difficulty: self.difficulty,
            location: self.location,
            images: self.images,
            is_active: self.is_active,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Public Handlers
// ============================================================================

/// Only active activities are listed publicly.
async fn list_activities(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Vec<Activity>> {
    let geo = GeoRadius::from_params(query.lat, query.lng, query.radius)?;
    let filter = FilterBuilder::new()
        .require(Predicate::eq("isActive", true))
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .eq("destinationId", query.destination_id.map(|id| id.to_string()))
        .eq("category", query.category)
        .eq("difficulty", query.difficulty)
        .range("price", "price", query.min_price, query.max_price)
        .range("durationHours", "duration", query.min_duration, query.max_duration)
        .near("location", geo)
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Activity>().page(filter, sort, page).await?)
}

async fn get_activity(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Activity> {
    let activity = state.repo::<Activity>().require(id).await?;
    if !activity.is_active {
        return Err(CoreError::not_found("Activity", id).into());
    }
    ok(activity)
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn create_activity(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<ActivityInput>,
) -> Created<Activity> {
    input.check(&state).await?;
    let activity = input.into_activity(Uuid::new_v4(), Utc::now());
    state.repo::<Activity>().insert(&activity).await?;

    tracing::info!(id = %activity.id, name = %activity.name, "activity created");
    created(activity, "Activity created successfully")
}

async fn update_activity(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<ActivityInput>,
) -> ApiResult<Activity> {
    let repo = state.repo::<Activity>();
    let existing = repo.require(id).await?;
    input.check(&state).await?;

    let activity = input.into_activity(id, existing.created_at);
    repo.replace(&activity).await?;
    ok(activity)
}

async fn delete_activity(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Option<()>> {
    state.repo::<Activity>().delete(id).await?;
    tracing::info!(%id, "activity deleted");
    deleted("Activity deleted successfully")
}
