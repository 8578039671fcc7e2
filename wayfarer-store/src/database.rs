use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, QueryBuilder};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;
use wayfarer_core::collections;
use wayfarer_core::{DocumentStore, FindQuery, Predicate, StoreError, StoreResult, WriteBatch, WriteOp};

use crate::sql::{push_order_by, push_predicate};

/// Per-collection index setup runs once per process.
static COLLECTIONS_READY: OnceCell<()> = OnceCell::const_new();

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Create the expression indexes declared in the collection registry.
    pub async fn prepare_collections(&self) -> Result<(), sqlx::Error> {
        COLLECTIONS_READY
            .get_or_try_init(|| async {
                for spec in collections::registry().values() {
                    for field in spec.indexed_fields {
                        sqlx::query(&index_ddl(spec.name, field)).execute(&self.pool).await?;
                    }
                    info!(collection = spec.name, indexes = spec.indexed_fields.len(), "collection ready");
                }
                Ok::<(), sqlx::Error>(())
            })
            .await?;
        Ok(())
    }
}

/// Partial expression index on one document field. Names and fields come from
/// the static registry, never from requests.
fn index_ddl(collection: &str, field: &str) -> String {
    let slug: String = field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let path = field.split('.').collect::<Vec<_>>().join(",");
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{collection}_{slug} ON documents ((body #>> '{{{path}}}')) WHERE collection = '{collection}'"
    )
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// `createdAt`/`updatedAt` from the document body, so column order matches document order.
fn timestamps(doc: &Value) -> (DateTime<Utc>, DateTime<Utc>) {
    let read = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| ts.with_timezone(&Utc))
    };
    let now = Utc::now();
    (read("createdAt").unwrap_or(now), read("updatedAt").unwrap_or(now))
}

// ============================================================================
// Document store
// ============================================================================

/// All collections in one JSONB table.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: DbClient,
}

impl PgDocumentStore {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Connect, migrate and prepare collection indexes.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let db = DbClient::new(url, max_connections).await?;
        db.migrate().await?;
        db.prepare_collections().await?;
        Ok(Self::new(db))
    }

    fn pool(&self) -> &Pool<Postgres> {
        &self.db.pool
    }
}

fn scoped<'a>(select: &str, collection: &'a str, filter: &Predicate) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push(" WHERE collection = ");
    qb.push_bind(collection);
    qb.push(" AND ");
    push_predicate(&mut qb, filter);
    qb
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<()> {
        let (created_at, updated_at) = timestamps(&doc);
        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(doc))
        .bind(created_at)
        .bind(updated_at)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Value>> {
        let row: Option<Json<Value>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(backend)?;
        Ok(row.map(|Json(body)| body))
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Value>> {
        let mut qb = scoped("SELECT body FROM documents", collection, &query.filter);
        push_order_by(&mut qb, &query.sort);
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if query.skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));
        }

        let rows: Vec<Json<Value>> = qb
            .build_query_scalar()
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(|Json(body)| body).collect())
    }

    async fn count(&self, collection: &str, filter: &Predicate) -> StoreResult<u64> {
        let mut qb = scoped("SELECT COUNT(*) FROM documents", collection, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(self.pool()).await.map_err(backend)?;
        Ok(count.max(0) as u64)
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<bool> {
        let (_, updated_at) = timestamps(&doc);
        let result = sqlx::query("UPDATE documents SET body = $3, updated_at = $4 WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .bind(Json(doc))
            .bind(updated_at)
            .execute(self.pool())
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_many(&self, collection: &str, filter: &Predicate, patch: Value) -> StoreResult<u64> {
        if !patch.is_object() {
            return Err(StoreError::Backend("update patch must be a JSON object".to_string()));
        }
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET body = body || ");
        qb.push_bind(Json(patch));
        qb.push(", updated_at = NOW() WHERE collection = ");
        qb.push_bind(collection);
        qb.push(" AND ");
        push_predicate(&mut qb, filter);

        let result = qb.build().execute(self.pool()).await.map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tx = self.pool().begin().await.map_err(backend)?;

        for op in batch.ops {
            match op {
                WriteOp::Insert { collection, id, doc } => {
                    let (created_at, updated_at) = timestamps(&doc);
                    sqlx::query(
                        "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(Json(doc))
                    .bind(created_at)
                    .bind(updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;
                }
                WriteOp::Replace { collection, id, doc } => {
                    let (_, updated_at) = timestamps(&doc);
                    let result = sqlx::query(
                        "UPDATE documents SET body = $3, updated_at = $4 WHERE collection = $1 AND id = $2",
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(Json(doc))
                    .bind(updated_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(backend)?;

                    // Dropping `tx` rolls back
                    if result.rows_affected() == 0 {
                        return Err(StoreError::Missing {
                            collection: collection.to_string(),
                            id,
                        });
                    }
                }
            }
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }
}
