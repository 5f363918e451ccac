//! Record store abstraction.
//!
//! The hosted store exposes per-collection CRUD over JSON documents with
//! equality filters, one sort field, and a limit — nothing richer, and no
//! cross-collection transactions. The backend-agnostic [`RecordStore`] trait
//! captures exactly that surface. Two implementations exist:
//!
//! - [`http::HttpStore`]: the hosted REST backend (default)
//! - [`memory::MemoryStore`]: in-memory backend for tests and `--offline`
//!
//! Typed access goes through `crm::Repository`, which scopes every call to
//! the signed-in owner.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Sort direction for [`ListQuery::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Query parameters accepted by every `list` call.
///
/// Filters are equality-only, matching the hosted store's `where` clause.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Backend-agnostic record store.
///
/// Documents are JSON objects. The store assigns `id` on create; everything
/// else (owner scoping, timestamps) is the caller's responsibility. Delivery
/// is at-least-once and there is no batch or transaction primitive.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List documents in `collection` matching `query`.
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Value>, StoreError>;

    /// Insert a document. The store assigns `id` and echoes the stored row.
    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError>;

    /// Merge `patch` into the document with this id.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Remove the document with this id.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
