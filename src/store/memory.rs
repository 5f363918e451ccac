//! In-memory record store backend.
//!
//! Serves two roles, mirroring how the hosted backend sits next to an
//! embedded one in similar tools: the `--offline` demo mode, and the backend
//! every test suite runs against. Semantics match the hosted store: equality
//! filters, one sort field, limit, id assignment on create, last-write-wins
//! updates.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;

use super::{ListQuery, RecordStore, SortOrder};

#[derive(Default)]
struct Shared {
    collections: HashMap<String, Vec<Value>>,
    /// Remaining operation count per collection that should fail with
    /// `Unavailable`. Fault injection for the test suites.
    faults: HashMap<String, u32>,
}

/// In-memory store. Cheap to clone state out of; all access goes through one
/// mutex, which is fine for a single-user CLI and for tests.
#[derive(Default)]
pub struct MemoryStore {
    shared: Mutex<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations touching `collection` fail with
    /// [`StoreError::Unavailable`]. Used by the test suites to exercise the
    /// log-and-notify error paths.
    pub fn fail_next(&self, collection: &str, count: u32) {
        let mut shared = self.shared.lock().expect("memory store lock");
        shared.faults.insert(collection.to_string(), count);
    }

    fn check_fault(shared: &mut Shared, collection: &str) -> Result<(), StoreError> {
        if let Some(remaining) = shared.faults.get_mut(collection) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::Unavailable(format!(
                    "injected fault on '{collection}'"
                )));
            }
        }
        Ok(())
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

/// Stringified view of a field, for equality filtering.
fn field_text(doc: &Value, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare_fields(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        let mut shared = self.shared.lock().expect("memory store lock");
        Self::check_fault(&mut shared, collection)?;

        let rows = shared.collections.get(collection).cloned().unwrap_or_default();
        let mut matched: Vec<Value> = rows
            .into_iter()
            .filter(|doc| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| field_text(doc, field).as_deref() == Some(value))
            })
            .collect();

        if let Some((field, order)) = &query.order {
            matched.sort_by(|a, b| {
                let cmp = compare_fields(a, b, field);
                match order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn create(&self, collection: &str, mut document: Value) -> Result<Value, StoreError> {
        let mut shared = self.shared.lock().expect("memory store lock");
        Self::check_fault(&mut shared, collection)?;

        let object = document
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("document must be a JSON object".into()))?;
        let needs_id = object
            .get("id")
            .and_then(Value::as_str)
            .is_none_or(str::is_empty);
        if needs_id {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        shared
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().expect("memory store lock");
        Self::check_fault(&mut shared, collection)?;

        let patch_object = patch
            .as_object()
            .ok_or_else(|| StoreError::Serialization("patch must be a JSON object".into()))?
            .clone();

        let rows = shared
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let doc = rows
            .iter_mut()
            .find(|doc| doc_id(doc) == Some(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let object = doc
            .as_object_mut()
            .ok_or_else(|| StoreError::Serialization("stored document is not an object".into()))?;
        for (key, value) in patch_object {
            object.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().expect("memory store lock");
        Self::check_fault(&mut shared, collection)?;

        let rows = shared
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let before = rows.len();
        rows.retain(|doc| doc_id(doc) != Some(id));
        if rows.len() == before {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn create_assigns_id_and_list_filters_by_equality() {
        let store = MemoryStore::new();
        let created = store
            .create("leads", json!({"owner_id": "u1", "name": "A"}))
            .await
            .expect("create");
        assert!(!created["id"].as_str().expect("id").is_empty());

        store
            .create("leads", json!({"owner_id": "u2", "name": "B"}))
            .await
            .expect("create");

        let mine = store
            .list("leads", &ListQuery::new().where_eq("owner_id", "u1"))
            .await
            .expect("list");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["name"], "A");
    }

    #[tokio::test]
    async fn list_orders_and_limits() {
        let store = MemoryStore::new();
        for ts in ["2026-01-02T00:00:00Z", "2026-01-03T00:00:00Z", "2026-01-01T00:00:00Z"] {
            store
                .create("leads", json!({"owner_id": "u1", "created_at": ts}))
                .await
                .expect("create");
        }

        let rows = store
            .list(
                "leads",
                &ListQuery::new()
                    .order_by("created_at", SortOrder::Desc)
                    .limit(2),
            )
            .await
            .expect("list");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["created_at"], "2026-01-03T00:00:00Z");
        assert_eq!(rows[1]["created_at"], "2026-01-02T00:00:00Z");
    }

    #[tokio::test]
    async fn update_merges_and_missing_id_is_not_found() {
        let store = MemoryStore::new();
        let created = store
            .create("deals", json!({"owner_id": "u1", "stage": "new"}))
            .await
            .expect("create");
        let id = created["id"].as_str().expect("id").to_string();

        store
            .update("deals", &id, json!({"stage": "closed_won"}))
            .await
            .expect("update");
        let rows = store.list("deals", &ListQuery::new()).await.expect("list");
        assert_eq!(rows[0]["stage"], "closed_won");
        assert_eq!(rows[0]["owner_id"], "u1");

        let err = store
            .update("deals", "missing", json!({"stage": "new"}))
            .await
            .expect_err("missing id");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fail_next_injects_unavailable_then_recovers() {
        let store = MemoryStore::new();
        store.fail_next("leads", 1);

        let err = store
            .list("leads", &ListQuery::new())
            .await
            .expect_err("injected fault");
        assert!(matches!(err, StoreError::Unavailable(_)));

        store
            .list("leads", &ListQuery::new())
            .await
            .expect("recovered");
    }
}
