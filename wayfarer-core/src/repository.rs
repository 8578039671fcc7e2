use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::search::{FindQuery, PageRequest, Pagination, Predicate, Sort};
use crate::{CoreError, CoreResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("document {id} missing from {collection}")]
    Missing { collection: String, id: Uuid },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record persisted as one JSON document in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Human-readable name used in not-found errors.
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;
}

// ============================================================================
// Write batches
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert {
        collection: &'static str,
        id: Uuid,
        doc: Value,
    },
    /// Fails the whole batch if the document does not exist.
    Replace {
        collection: &'static str,
        id: Uuid,
        doc: Value,
    },
}

/// Writes that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Document>(&mut self, doc: &T) -> StoreResult<&mut Self> {
        self.ops.push(WriteOp::Insert {
            collection: T::COLLECTION,
            id: doc.id(),
            doc: serde_json::to_value(doc)?,
        });
        Ok(self)
    }

    pub fn replace<T: Document>(&mut self, doc: &T) -> StoreResult<&mut Self> {
        self.ops.push(WriteOp::Replace {
            collection: T::COLLECTION,
            id: doc.id(),
            doc: serde_json::to_value(doc)?,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// ============================================================================
// Store trait
// ============================================================================

/// Backend-agnostic document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<()>;

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Value>>;

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Value>>;

    async fn count(&self, collection: &str, filter: &Predicate) -> StoreResult<u64>;

    /// Returns false when no document with `id` exists.
    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<bool>;

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<bool>;

    /// Shallow-merge `patch` (a JSON object) into every matching document.
    async fn update_many(&self, collection: &str, filter: &Predicate, patch: Value) -> StoreResult<u64>;

    /// Apply every write atomically.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

// ============================================================================
// Typed repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Typed access to one collection.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn insert(&self, doc: &T) -> CoreResult<()> {
        let value = serde_json::to_value(doc)?;
        self.store.insert(T::COLLECTION, doc.id(), value).await?;
        tracing::debug!(collection = T::COLLECTION, id = %doc.id(), "document inserted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Option<T>> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Like [`Repository::get`] but a missing document is a `NotFound` error.
    pub async fn require(&self, id: Uuid) -> CoreResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| CoreError::not_found(T::ENTITY, id))
    }

    pub async fn exists(&self, id: Uuid) -> CoreResult<bool> {
        Ok(self.store.get(T::COLLECTION, id).await?.is_some())
    }

    pub async fn find(&self, query: &FindQuery) -> CoreResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, query)
            .await?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(CoreError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Predicate) -> CoreResult<Option<T>> {
        let query = FindQuery::new(filter).limit(1);
        Ok(self.find(&query).await?.into_iter().next())
    }

    pub async fn count(&self, filter: &Predicate) -> CoreResult<u64> {
        Ok(self.store.count(T::COLLECTION, filter).await?)
    }

    /// One page of results plus metadata. Pages past the end come back empty.
    pub async fn page(&self, filter: Predicate, sort: Sort, page: PageRequest) -> CoreResult<Page<T>> {
        let total = self.count(&filter).await?;
        let items = if page.skip() >= total {
            Vec::new()
        } else {
            self.find(&FindQuery::new(filter).sorted(sort).page(page)).await?
        };

        Ok(Page {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn replace(&self, doc: &T) -> CoreResult<()> {
        let value = serde_json::to_value(doc)?;
        if !self.store.replace(T::COLLECTION, doc.id(), value).await? {
            return Err(CoreError::not_found(T::ENTITY, doc.id()));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<()> {
        if !self.store.delete(T::COLLECTION, id).await? {
            return Err(CoreError::not_found(T::ENTITY, id));
        }
        tracing::debug!(collection = T::COLLECTION, %id, "document deleted");
        Ok(())
    }

    pub async fn update_many(&self, filter: &Predicate, patch: Value) -> CoreResult<u64> {
        Ok(self.store.update_many(T::COLLECTION, filter, patch).await?)
    }
}
