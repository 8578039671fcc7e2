pub mod collections;
pub mod repository;
pub mod search;

use serde::Serialize;

pub use repository::{Document, DocumentStore, Page, Repository, StoreError, StoreResult, WriteBatch, WriteOp};
pub use search::{FilterBuilder, FindQuery, GeoRadius, PageLimits, PageRequest, Pagination, Predicate, Sort, SortDirection};

/// One entry of a validation failure, reported to clients as `{type, path, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("field", path, message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    #[error("Not available: {0}")]
    NotAvailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation(vec![FieldError::field(path, message)])
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Store(StoreError::Serialization(err))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_serializes_type_key() {
        let err = FieldError::field("checkIn", "must be a date");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "field");
        assert_eq!(json["path"], "checkIn");
        assert_eq!(json["message"], "must be a date");
    }

    #[test]
    fn test_not_found_display() {
        let err = CoreError::not_found("Hotel", "abc");
        assert_eq!(err.to_string(), "Hotel not found: abc");
    }
}
