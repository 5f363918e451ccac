//! Superseded-load handling.
//!
//! A page load is a fan-out of four list calls with nothing cancelling it on
//! navigation. The session guards against the stale-response hazard by
//! tagging each load with a generation and discarding results that lost the
//! race. This suite holds the first load's list calls at a gate, lets a
//! second load win, and verifies the first one is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

use pipeboard::auth::User;
use pipeboard::crm::Session;
use pipeboard::error::StoreError;
use pipeboard::form::LeadDraft;
use pipeboard::store::memory::MemoryStore;
use pipeboard::store::{ListQuery, RecordStore};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Wraps the memory backend and blocks the next `to_block` list calls until
/// released.
struct GatedStore {
    inner: MemoryStore,
    to_block: AtomicU32,
    blocked: AtomicU32,
    release: Notify,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            to_block: AtomicU32::new(0),
            blocked: AtomicU32::new(0),
            release: Notify::new(),
        }
    }

    fn block_next_lists(&self, count: u32) {
        self.to_block.store(count, Ordering::SeqCst);
    }

    fn blocked_now(&self) -> u32 {
        self.blocked.load(Ordering::SeqCst)
    }

    fn release_all(&self) {
        self.release.notify_waiters();
    }

    async fn maybe_block(&self) {
        let take = self
            .to_block
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if take.is_ok() {
            self.blocked.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for GatedStore {
    async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        self.maybe_block().await;
        self.inner.list(collection, query).await
    }

    async fn create(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        self.inner.create(collection, document).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

fn demo_user() -> User {
    User {
        id: "u-1".to_string(),
        email: "u@example.com".to_string(),
        display_name: None,
        created_at: None,
    }
}

#[tokio::test]
async fn superseded_load_is_discarded() {
    let store = Arc::new(GatedStore::new());
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let session = Arc::new(Session::new(dyn_store, demo_user()));

    // Seed one lead so the winning load has content to keep.
    session
        .create_lead(&LeadDraft {
            name: "Anna".into(),
            email: "anna@x.com".into(),
            ..LeadDraft::default()
        })
        .await
        .expect("create");

    // Hold the slow load's four list calls at the gate.
    store.block_next_lists(4);
    let slow = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.load().await }
    });
    while store.blocked_now() < 4 {
        sleep(Duration::from_millis(5)).await;
    }

    // A fresh load overtakes while the slow one hangs.
    let applied = timeout(TIMEOUT, session.load())
        .await
        .expect("no hang")
        .expect("load");
    assert!(applied, "the newer load must apply");

    // Release the slow load; its results lost the race.
    store.release_all();
    let applied = timeout(TIMEOUT, slow)
        .await
        .expect("no hang")
        .expect("join")
        .expect("load");
    assert!(!applied, "the superseded load must be discarded");

    // The cache still serves the winning load's data.
    let snapshot = session.data().await.expect("data");
    assert_eq!(snapshot.leads.len(), 1);
    assert_eq!(snapshot.leads[0].name, "Anna");
}

#[tokio::test]
async fn back_to_back_loads_both_apply() {
    let store = Arc::new(GatedStore::new());
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    let session = Session::new(dyn_store, demo_user());

    assert!(session.load().await.expect("load"));
    assert!(session.load().await.expect("load"));
}
