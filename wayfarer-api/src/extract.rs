//! Request extractors and the response envelope.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;
use wayfarer_core::{FieldError, Page, PageRequest, Pagination, Sort};
use wayfarer_shared::time::parse_datetime;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Extractors
// ============================================================================

/// `Json` whose rejections use the failure envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// JSON body that has passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

pub fn ok_with_message<T>(data: T, message: &str) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data).with_message(message)))
}

pub fn created<T>(data: T, message: &str) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data).with_message(message))))
}

pub fn paged<T>(page: Page<T>) -> ApiResult<Vec<T>> {
    Ok(Json(ApiResponse {
        success: true,
        data: page.items,
        pagination: Some(page.pagination),
        message: None,
    }))
}

/// Response for deletes: `data` is null.
pub fn deleted(message: impl Into<String>) -> ApiResult<Option<()>> {
    Ok(Json(ApiResponse::ok(None).with_message(message)))
}

// ============================================================================
// List helpers
// ============================================================================

pub fn page_request(state: &AppState, page: Option<u64>, limit: Option<u64>) -> Result<PageRequest, AppError> {
    Ok(PageRequest::resolve(page, limit, &state.page_limits())?)
}

pub fn sort(sort_by: Option<&str>, sort_order: Option<&str>, allowed: &[&str]) -> Result<Sort, AppError> {
    Ok(Sort::parse(sort_by, sort_order, allowed)?)
}

/// Parse a required start/end pair of query dates, reporting both when both are bad.
pub fn date_range(
    (start_path, start): (&str, Option<&str>),
    (end_path, end): (&str, Option<&str>),
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    match (query_date(start_path, start), query_date(end_path, end)) {
        (Ok(start), Ok(end)) => Ok((start, end)),
        (start, end) => Err(AppError::ValidationError(
            [start.err(), end.err()].into_iter().flatten().collect(),
        )),
    }
}

fn query_date(path: &str, raw: Option<&str>) -> Result<DateTime<Utc>, FieldError> {
    let raw = raw.ok_or_else(|| FieldError::field(path, format!("{} is required", path)))?;
    parse_datetime(raw).ok_or_else(|| FieldError::field(path, format!("{} must be a valid date", path)))
}
