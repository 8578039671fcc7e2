use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;
use wayfarer_core::{DocumentStore, FindQuery, Predicate, StoreError, StoreResult, WriteBatch, WriteOp};

type Collection = HashMap<Uuid, Value>;

/// Process-local store for development and tests. Filters with [`Predicate::matches`].
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn merge(doc: &mut Value, patch: &Value) {
    if let (Some(target), Some(fields)) = (doc.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
}

fn duplicate(collection: &str, id: Uuid) -> StoreError {
    StoreError::Backend(format!("duplicate id {} in {}", id, collection))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(duplicate(collection, id));
        }
        docs.insert(id, doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(&id)).cloned())
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(&Uuid, &Value)> = docs.iter().filter(|(_, doc)| query.filter.matches(doc)).collect();
        matched.sort_by(|(id_a, a), (id_b, b)| query.sort.compare(a, b).then_with(|| id_a.cmp(id_b)));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn count(&self, collection: &str, filter: &Predicate) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn replace(&self, collection: &str, id: Uuid, doc: Value) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection).and_then(|docs| docs.get_mut(&id)) {
            Some(existing) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|docs| docs.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn update_many(&self, collection: &str, filter: &Predicate, patch: Value) -> StoreResult<u64> {
        if !patch.is_object() {
            return Err(StoreError::Backend("update patch must be a JSON object".to_string()));
        }
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut updated = 0;
        for doc in docs.values_mut().filter(|doc| filter.matches(doc)) {
            merge(doc, &patch);
            updated += 1;
        }
        Ok(updated)
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut collections = self.collections.write().await;

        // Check every op before touching anything
        let mut pending_inserts: Vec<(&str, Uuid)> = Vec::new();
        for op in &batch.ops {
            match op {
                WriteOp::Insert { collection, id, .. } => {
                    let exists = collections.get(*collection).is_some_and(|docs| docs.contains_key(id));
                    if exists || pending_inserts.contains(&(*collection, *id)) {
                        return Err(duplicate(collection, *id));
                    }
                    pending_inserts.push((*collection, *id));
                }
                WriteOp::Replace { collection, id, .. } => {
                    let exists = collections.get(*collection).is_some_and(|docs| docs.contains_key(id))
                        || pending_inserts.contains(&(*collection, *id));
                    if !exists {
                        return Err(StoreError::Missing {
                            collection: collection.to_string(),
                            id: *id,
                        });
                    }
                }
            }
        }

        for op in batch.ops {
            match op {
                WriteOp::Insert { collection, id, doc } | WriteOp::Replace { collection, id, doc } => {
                    collections.entry(collection.to_string()).or_default().insert(id, doc);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfarer_core::{PageRequest, Sort};

    fn doc(name: &str, created: &str) -> Value {
        json!({ "name": name, "createdAt": created, "tags": ["a"] })
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = MemoryDocumentStore::new();
        let id = Uuid::new_v4();
        store.insert("faqs", id, doc("first", "2024-01-01T00:00:00Z")).await.unwrap();

        assert_eq!(store.get("faqs", id).await.unwrap().unwrap()["name"], "first");
        assert!(store.get("hotels", id).await.unwrap().is_none());
        assert!(store.insert("faqs", id, json!({})).await.is_err());

        assert!(store.delete("faqs", id).await.unwrap());
        assert!(!store.delete("faqs", id).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_sorts_and_pages() {
        let store = MemoryDocumentStore::new();
        for (i, name) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            let created = format!("2024-01-0{}T00:00:00Z", i + 1);
            store.insert("faqs", Uuid::new_v4(), doc(name, &created)).await.unwrap();
        }

        let page = PageRequest { page: 2, limit: 2 };
        let found = store
            .find("faqs", &FindQuery::new(Predicate::All).page(page))
            .await
            .unwrap();
        let names: Vec<&str> = found.iter().filter_map(|d| d["name"].as_str()).collect();
        // Newest first: e d | c b | a
        assert_eq!(names, vec!["c", "b"]);

        let past_end = PageRequest { page: 9, limit: 2 };
        assert!(store
            .find("faqs", &FindQuery::new(Predicate::All).page(past_end))
            .await
            .unwrap()
            .is_empty());

        let sorted = store
            .find("faqs", &FindQuery::new(Predicate::All).sorted(Sort::asc("name")).limit(1))
            .await
            .unwrap();
        assert_eq!(sorted[0]["name"], "a");
    }

    #[tokio::test]
    async fn test_update_many_merges() {
        let store = MemoryDocumentStore::new();
        for name in ["x", "y"] {
            store.insert("notifications", Uuid::new_v4(), json!({ "name": name, "isRead": false })).await.unwrap();
        }
        let updated = store
            .update_many("notifications", &Predicate::eq("isRead", false), json!({ "isRead": true }))
            .await
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(store.count("notifications", &Predicate::eq("isRead", true)).await.unwrap(), 2);
        assert!(store.update_many("notifications", &Predicate::All, json!([1])).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        let existing = Uuid::new_v4();
        store.insert("vehicles", existing, json!({ "isAvailable": true })).await.unwrap();

        // Second op targets a missing document, so the first must not land
        let fresh = Uuid::new_v4();
        let batch = WriteBatch {
            ops: vec![
                WriteOp::Insert {
                    collection: "reservations",
                    id: fresh,
                    doc: json!({ "status": "Confirmed" }),
                },
                WriteOp::Replace {
                    collection: "vehicles",
                    id: Uuid::new_v4(),
                    doc: json!({ "isAvailable": false }),
                },
            ],
        };
        assert!(matches!(store.commit(batch).await, Err(StoreError::Missing { .. })));
        assert!(store.get("reservations", fresh).await.unwrap().is_none());

        let batch = WriteBatch {
            ops: vec![
                WriteOp::Insert {
                    collection: "reservations",
                    id: fresh,
                    doc: json!({ "status": "Confirmed" }),
                },
                WriteOp::Replace {
                    collection: "vehicles",
                    id: existing,
                    doc: json!({ "isAvailable": false }),
                },
            ],
        };
        store.commit(batch).await.unwrap();
        assert!(store.get("reservations", fresh).await.unwrap().is_some());
        assert_eq!(store.get("vehicles", existing).await.unwrap().unwrap()["isAvailable"], false);
    }
}
