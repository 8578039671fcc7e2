use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;
use wayfarer_core::{CoreError, FilterBuilder, FindQuery, Predicate, SortDirection};
use wayfarer_shared::Faq;

use crate::error::AppError;
use crate::extract::{created, deleted, ok, page_request, paged, sort, ApiPath, ApiQuery, ApiResult, Created, ValidatedJson};
use crate::state::AppState;

const SEARCH_FIELDS: &[&str] = &["question", "answer"];
const SORT_FIELDS: &[&str] = &["order", "question", "category", "updatedAt"];

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/faqs/public", get(list_faqs))
        .route("/faqs/public/{id}", get(get_faq))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/faqs/admin", post(create_faq))
        .route("/faqs/admin/{id}", put(update_faq).delete(delete_faq))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FaqInput {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 5, max = 500, message = "question must be between 5 and 500 characters"))]
    pub question: String,
    #[validate(length(min = 1, message = "answer is required"))]
    pub answer: String,
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "order must not be negative"))]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

fn default_true() -> bool {
    true
}

/// Length limits apply to the question as stored.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// Questions are unique ignoring case and surrounding whitespace.
async fn ensure_unique_question(state: &AppState, question: &str, except: Option<Uuid>) -> Result<(), AppError> {
    let candidates = state
        .repo::<Faq>()
        .find(&FindQuery::new(Predicate::Contains {
            field: "question".to_string(),
            term: question.to_string(),
        }))
        .await?;

    let clash = candidates
        .iter()
        .any(|faq| Some(faq.id) != except && faq.question.trim().to_lowercase() == question.to_lowercase());
    if clash {
        return Err(CoreError::Duplicate(format!("an FAQ with question '{}' already exists", question)).into());
    }
    Ok(())
}

// ============================================================================
// Public Handlers
// ============================================================================

/// Published FAQs, ordered by `order` unless another sort is requested.
async fn list_faqs(State(state): State<AppState>, ApiQuery(query): ApiQuery<FaqQuery>) -> ApiResult<Vec<Faq>> {
    let filter = FilterBuilder::new()
        .require(Predicate::eq("isPublished", true))
        .search(query.search_term.as_deref(), SEARCH_FIELDS)
        .eq("category", query.category)
        .build()?;

    let mut sort = sort(query.sort_by.as_deref(), query.sort_order.as_deref(), SORT_FIELDS)?;
    if query.sort_by.is_none() {
        sort.field = "order".to_string();
        if query.sort_order.is_none() {
            sort.direction = SortDirection::Asc;
        }
    }
    let page = page_request(&state, query.page, query.limit)?;

    paged(state.repo::<Faq>().page(filter, sort, page).await?)
}

async fn get_faq(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Faq> {
    let faq = state.repo::<Faq>().require(id).await?;
    if !faq.is_published {
        return Err(CoreError::not_found("FAQ", id).into());
    }
    ok(faq)
}

// ============================================================================
// Admin Handlers
// ============================================================================

async fn create_faq(State(state): State<AppState>, ValidatedJson(input): ValidatedJson<FaqInput>) -> Created<Faq> {
    ensure_unique_question(&state, &input.question, None).await?;

    let now = Utc::now();
    let faq = Faq {
        id: Uuid::new_v4(),
        question: input.question,
        answer: input.answer,
        category: input.category,
        order: input.order,
        is_published: input.is_published,
        created_at: now,
        updated_at: now,
    };
    state.repo::<Faq>().insert(&faq).await?;

    tracing::info!(id = %faq.id, "faq created");
    created(faq, "FAQ created successfully")
}

async fn update_faq(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(input): ValidatedJson<FaqInput>,
) -> ApiResult<Faq> {
    let repo = state.repo::<Faq>();
    let mut faq = repo.require(id).await?;
    ensure_unique_question(&state, &input.question, Some(id)).await?;

    faq.question = input.question;
    faq.answer = input.answer;
    faq.category = input.category;
    faq.order = input.order;
    faq.is_published = input.is_published;
    faq.updated_at = Utc::now();
    repo.replace(&faq).await?;

    ok(faq)
}

async fn delete_faq(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Option<()>> {
    state.repo::<Faq>().delete(id).await?;
    deleted("FAQ deleted successfully")
}
