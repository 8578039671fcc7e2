use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use validator::{ValidationErrors, ValidationErrorsKind};
use wayfarer_core::{CoreError, FieldError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("Validation failed")]
    ValidationError(Vec<FieldError>),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("Rate limit exceeded")]
    TooManyRequests,
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(path: &str, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![FieldError::field(path, message)])
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message, errors) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "authentication", msg, None),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "authorization", msg, None),
            AppError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation",
                "Validation failed".to_string(),
                Some(errors),
            ),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit",
                "Rate limit exceeded".to_string(),
                None,
            ),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "server", "Internal Server Error".to_string(), None)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "server", "Internal Server Error".to_string(), None)
            }
        };

        let errors = errors.unwrap_or_else(|| vec![FieldError::new(kind, "", message.clone())]);
        let body = Json(json!({
            "success": false,
            "message": message,
            "errors": errors,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => AppError::ValidationError(errors),
            CoreError::NotFound { .. } => AppError::NotFoundError(err.to_string()),
            CoreError::Duplicate(_) | CoreError::NotAvailable(_) => AppError::ConflictError(err.to_string()),
            CoreError::Store(store) => AppError::InternalServerError(store.to_string()),
        }
    }
}

// ============================================================================
// Extractor rejections
// ============================================================================

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(vec![FieldError::new("body", "", rejection.body_text())])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(vec![FieldError::new("query", "", rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(vec![FieldError::new("path", "", rejection.body_text())])
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten("", &errors, &mut fields);
        fields.sort_by(|a, b| a.path.cmp(&b.path));
        AppError::ValidationError(fields)
    }
}

/// Flatten nested validator output into `{type, path, message}` entries with camelCase dotted paths.
fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let name = camel_case(&field.to_string());
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{}.{}", prefix, name)
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", path));
                    out.push(FieldError::new(error.code.to_string(), path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{}.{}", path, index), inner, out);
                }
            }
        }
    }
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
