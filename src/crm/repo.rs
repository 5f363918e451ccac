//! Owner-scoped typed repositories.
//!
//! [`Repository`] is the only path from typed records to the store. Every
//! list call injects `where owner_id = <me>`, which is the sole ownership
//! enforcement in the whole system — the store itself has no access control
//! beyond the token.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{ListQuery, RecordStore, SortOrder};

use super::types::{Activity, Client, Deal, Lead, UserSettings};

/// Binds a record type to its store collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

impl Entity for Lead {
    const COLLECTION: &'static str = "leads";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Client {
    const COLLECTION: &'static str = "clients";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Deal {
    const COLLECTION: &'static str = "deals";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Activity {
    const COLLECTION: &'static str = "activities";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for UserSettings {
    const COLLECTION: &'static str = "user_settings";

    fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

pub struct Repository<T> {
    store: Arc<dyn RecordStore>,
    owner_id: String,
    _marker: PhantomData<fn() -> T>,
}

// Manual impl: `#[derive(Clone)]` would demand `T: Clone` for no reason.
impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            owner_id: self.owner_id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn RecordStore>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
            _marker: PhantomData,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// List this owner's records. The owner filter is always appended, on
    /// top of whatever the caller asked for.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<T>, StoreError> {
        let query = query.where_eq("owner_id", &self.owner_id);
        let rows = self.store.list(T::COLLECTION, &query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .collect()
    }

    pub async fn list_newest_first(&self) -> Result<Vec<T>, StoreError> {
        self.list(ListQuery::new().order_by("created_at", SortOrder::Desc))
            .await
    }

    /// Insert a record; the store assigns the id and echoes the stored row.
    pub async fn create(&self, record: &T) -> Result<T, StoreError> {
        let document = serde_json::to_value(record)?;
        let stored = self.store.create(T::COLLECTION, document).await?;
        serde_json::from_value(stored).map_err(StoreError::from)
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<(), StoreError> {
        self.store.update(T::COLLECTION, id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }
}
