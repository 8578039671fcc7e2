use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;
use wayfarer_core::{CoreError, FilterBuilder, Predicate};
use wayfarer_shared::{Notification, NotificationKind};

use crate::error::AppError;
use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::middleware::Claims;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", put(mark_all_read))
        .route("/notifications/{id}/read", put(mark_read))
        .route("/notifications/{id}", delete(delete_notification))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/notifications/admin", post(create_notification))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// `true` lists unread notifications only.
    pub unread: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
    #[serde(default = "default_kind")]
    pub kind: NotificationKind,
    pub link: Option<String>,
}

fn default_kind() -> NotificationKind {
    NotificationKind::System
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    pub updated: u64,
}

async fn owned_notification(state: &AppState, id: Uuid, claims: &Claims) -> Result<Notification, AppError> {
    let notification = state.repo::<Notification>().require(id).await?;
    if notification.user_id != claims.sub {
        return Err(CoreError::not_found("Notification", id).into());
    }
    Ok(notification)
}

// ============================================================================
// User Handlers
// ============================================================================

async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let filter = FilterBuilder::new()
        .require(Predicate::eq("userId", claims.sub.as_str()))
        .eq("isRead", query.unread.filter(|u| *u).map(|_| false))
        .build()?;

    let sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), &["isRead"])?;
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Notification>().page(filter, sort, page).await?)
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Notification> {
    let mut notification = owned_notification(&state, id, &claims).await?;
    if !notification.is_read {
        notification.mark_read();
        state.repo::<Notification>().replace(&notification).await?;
    }
    ok(notification)
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<MarkedRead> {
    let filter = Predicate::eq("userId", claims.sub.as_str()).and(Predicate::eq("isRead", false));
    let updated = state
        .repo::<Notification>()
        .update_many(&filter, json!({ "isRead": true, "updatedAt": Utc::now() }))
        .await?;

    tracing::debug!(user = %claims.sub, updated, "notifications marked read");
    ok(MarkedRead { updated })
}

async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Option<()>> {
    owned_notification(&state, id, &claims).await?;
    state.repo::<Notification>().delete(id).await?;
    deleted("Notification deleted successfully")
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn create_notification(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateNotificationRequest>,
) -> Created<Notification> {
    let mut notification = Notification::new(input.user_id, input.kind, input.title, input.message);
    if let Some(link) = input.link {
        notification = notification.with_link(link);
    }
    state.repo::<Notification>().insert(&notification).await?;
    created(notification, "Notification sent")
}
