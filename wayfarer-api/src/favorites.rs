use axum::{
    extract::State,
    routing::{delete, get},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wayfarer_core::{CoreError, FilterBuilder, Predicate};
use wayfarer_shared::{Activity, Destination, Favorite, FavoriteItemType, Hotel, Vehicle};

use crate::error::AppError;
use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiJson, ApiPath, ApiQuery, ApiResult, Created};
use crate::middleware::Claims;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/{id}", delete(remove_favorite))
        .route("/favorites/check/{item_type}/{item_id}", get(check_favorite))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub item_type: Option<FavoriteItemType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteRequest {
    pub item_type: FavoriteItemType,
    pub item_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub is_favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_id: Option<Uuid>,
}

fn favorite_filter(user_id: &str, item_type: FavoriteItemType, item_id: Uuid) -> Predicate {
    Predicate::eq("userId", user_id)
        .and(Predicate::eq("itemType", item_type.as_str()))
        .and(Predicate::eq("itemId", item_id.to_string()))
}

/// The favorited item must exist in its own collection.
async fn require_item(state: &AppState, item_type: FavoriteItemType, item_id: Uuid) -> Result<(), AppError> {
    match item_type {
        FavoriteItemType::Destination => state.repo::<Destination>().require(item_id).await.map(drop),
        FavoriteItemType::Hotel => state.repo::<Hotel>().require(item_id).await.map(drop),
        FavoriteItemType::Vehicle => state.repo::<Vehicle>().require(item_id).await.map(drop),
        FavoriteItemType::Activity => state.repo::<Activity>().require(item_id).await.map(drop),
    }?;
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<FavoriteQuery>,
) -> ApiResult<Vec<Favorite>> {
    let filter = FilterBuilder::new()
        .require(Predicate::eq("userId", claims.sub.as_str()))
        .eq("itemType", query.item_type.map(|t| t.as_str()))
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), &[])?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Favorite>().page(filter, sort, page).await?)
}

async fn add_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(input): ApiJson<AddFavoriteRequest>,
) -> Created<Favorite> {
    require_item(&state, input.item_type, input.item_id).await?;

    let repo = state.repo::<Favorite>();
    let existing = repo
        .find_one(favorite_filter(&claims.sub, input.item_type, input.item_id))
        .await?;
    if existing.is_some() {
        return Err(CoreError::Duplicate(format!("{} is already in favorites", input.item_type.as_str())).into());
    }

    let favorite = Favorite::new(claims.sub, input.item_type, input.item_id);
    repo.insert(&favorite).await?;
    created(favorite, "Added to favorites")
}

async fn remove_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Option<()>> {
    let repo = state.repo::<Favorite>();
    let favorite = repo.require(id).await?;
    if favorite.user_id != claims.sub {
        return Err(CoreError::not_found("Favorite", id).into());
    }
    repo.delete(id).await?;
    deleted("Removed from favorites")
}

async fn check_favorite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath((item_type, item_id)): ApiPath<(String, Uuid)>,
) -> ApiResult<FavoriteStatus> {
    let item_type: FavoriteItemType = item_type
        .parse()
        .map_err(|e: String| AppError::validation("itemType", e))?;

    let favorite = state
        .repo::<Favorite>()
        .find_one(favorite_filter(&claims.sub, item_type, item_id))
        .await?;

    ok(FavoriteStatus {
        is_favorite: favorite.is_some(),
        favorite_id: favorite.map(|f| f.id),
    })
}
