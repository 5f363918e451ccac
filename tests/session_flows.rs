//! End-to-end flows over the in-memory backend.
//!
//! These tests drive a real `Session` the way the CLI does and verify the
//! cross-module behavior:
//! - owner scoping across two sessions on one store
//! - create/delete keeping list order intact
//! - stage changes moving a deal across board columns and into the win rate
//! - synthetic history entries after tracked mutations
//! - client-side validation blocking store calls entirely
//! - bulk wipe counting partial failures

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use pipeboard::auth::User;
use pipeboard::crm::types::{ActivityKind, Currency, DealStage};
use pipeboard::crm::{LogOutcome, Session};
use pipeboard::error::StoreError;
use pipeboard::form::{DealDraft, DealForm, LeadDraft, LeadForm, SubmitError};
use pipeboard::report::Report;
use pipeboard::store::memory::MemoryStore;
use pipeboard::store::{ListQuery, RecordStore};
use pipeboard::view::{TimeWindow, group_by_stage};

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        display_name: None,
        created_at: None,
    }
}

fn session_on(store: &Arc<MemoryStore>, user_id: &str) -> Session {
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    Session::new(dyn_store, user(user_id))
}

fn lead_draft(name: &str, source: &str) -> LeadDraft {
    LeadDraft {
        name: name.to_string(),
        email: format!("{}@x.com", name.to_ascii_lowercase()),
        source: source.to_string(),
        ..LeadDraft::default()
    }
}

#[tokio::test]
async fn created_lead_appears_at_head_and_delete_keeps_order() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");

    session
        .create_lead(&lead_draft("First", "website"))
        .await
        .expect("create");
    session
        .create_lead(&lead_draft("Second", "website"))
        .await
        .expect("create");
    let (third, _) = session
        .create_lead(&lead_draft("A", "сайт"))
        .await
        .expect("create");

    async fn names(session: &Session) -> Vec<String> {
        session
            .data()
            .await
            .expect("data")
            .leads
            .iter()
            .map(|l| l.name.clone())
            .collect()
    }
    assert_eq!(names(&session).await, ["A", "Second", "First"]);

    session.delete_lead(&third.id).await.expect("delete");
    assert_eq!(names(&session).await, ["Second", "First"]);
}

#[tokio::test]
async fn sessions_never_see_each_others_records() {
    let store = Arc::new(MemoryStore::new());
    let mine = session_on(&store, "u-1");
    let theirs = session_on(&store, "u-2");

    mine.create_lead(&lead_draft("Mine", "website"))
        .await
        .expect("create");
    theirs
        .create_lead(&lead_draft("Theirs", "referral"))
        .await
        .expect("create");

    let my_data = mine.data().await.expect("data");
    assert_eq!(my_data.leads.len(), 1);
    assert_eq!(my_data.leads[0].name, "Mine");
    // History rows are owner-scoped too.
    assert!(my_data.activities.iter().all(|a| a.owner_id == "u-1"));
}

#[tokio::test]
async fn stage_change_moves_deal_across_board_and_into_win_rate() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");

    let mut form = DealForm::create();
    form.draft = DealDraft {
        title: "Contract".into(),
        value: dec!(1000),
        ..DealDraft::default()
    };
    let (deal, _) = form.submit(&session).await.expect("submit");
    assert_eq!(deal.stage, DealStage::New);

    let snapshot = session.data().await.expect("data");
    let columns = group_by_stage(&snapshot.deals);
    assert_eq!(columns[0].deals.len(), 1, "new column holds the deal");

    session
        .set_deal_stage(&deal.id, DealStage::ClosedWon)
        .await
        .expect("stage change");

    let snapshot = session.data().await.expect("data");
    let columns = group_by_stage(&snapshot.deals);
    for column in &columns {
        let expected = usize::from(column.stage == DealStage::ClosedWon);
        assert_eq!(column.deals.len(), expected, "stage {:?}", column.stage);
    }

    let report = Report::build(&snapshot, TimeWindow::Days30, chrono::Utc::now());
    assert_eq!(report.won_count, 1);
    assert_eq!(report.lost_count, 0);
    assert_eq!(report.win_rate, 100.0);
    assert_eq!(report.won_value, dec!(1000));
}

#[tokio::test]
async fn tracked_mutations_write_synthetic_history() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");

    let (lead, outcome) = session
        .create_lead(&lead_draft("Anna", "website"))
        .await
        .expect("create");
    assert_eq!(outcome, LogOutcome::Written);

    let (_, outcome) = session
        .update_lead(&lead.id, &lead_draft("Anna Maria", "website"))
        .await
        .expect("update");
    assert_eq!(outcome, LogOutcome::Written);

    let snapshot = session.data().await.expect("data");
    let kinds: Vec<ActivityKind> = snapshot.activities.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&ActivityKind::LeadCreated));
    assert!(kinds.contains(&ActivityKind::LeadUpdated));
    assert_eq!(
        snapshot.activities[0].description,
        "Updated lead: Anna Maria"
    );
}

#[tokio::test]
async fn history_failure_never_fails_the_primary_mutation() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");
    // Prime the cache so the mutation path does not need an extra load.
    session.load().await.expect("load");

    store.fail_next("activities", 10);
    let (lead, outcome) = session
        .create_lead(&lead_draft("Anna", "website"))
        .await
        .expect("primary mutation must succeed");
    assert!(!lead.id.is_empty());
    assert_eq!(outcome, LogOutcome::Deferred);
    assert_eq!(session.pending_history(), 1);

    // Store recovers; the deferred entry is delivered by the next flush.
    store.fail_next("activities", 0);
    let report = session.flush_history().await;
    assert_eq!(report.delivered, 1);
    assert_eq!(session.pending_history(), 0);
}

/// A store that must never be reached. Used to prove validation rejects a
/// draft before any store call is issued.
struct PanicStore;

#[async_trait::async_trait]
impl RecordStore for PanicStore {
    async fn list(
        &self,
        _collection: &str,
        _query: &ListQuery,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        panic!("store must not be reached by an invalid draft");
    }

    async fn create(
        &self,
        _collection: &str,
        _document: serde_json::Value,
    ) -> Result<serde_json::Value, StoreError> {
        panic!("store must not be reached by an invalid draft");
    }

    async fn update(
        &self,
        _collection: &str,
        _id: &str,
        _patch: serde_json::Value,
    ) -> Result<(), StoreError> {
        panic!("store must not be reached by an invalid draft");
    }

    async fn delete(&self, _collection: &str, _id: &str) -> Result<(), StoreError> {
        panic!("store must not be reached by an invalid draft");
    }
}

#[tokio::test]
async fn invalid_deal_draft_is_rejected_before_any_store_call() {
    let session = Session::new(Arc::new(PanicStore), user("u-1"));

    let mut form = DealForm::create();
    form.draft = DealDraft {
        title: "Contract".into(),
        value: dec!(0),
        ..DealDraft::default()
    };
    let err = form.submit(&session).await.expect_err("must be rejected");
    assert!(matches!(err, SubmitError::Invalid(_)));

    let mut form = LeadForm::create();
    form.draft.email = "a@x.com".into(); // name still missing
    let err = form.submit(&session).await.expect_err("must be rejected");
    let SubmitError::Invalid(message) = err else {
        panic!("expected Invalid");
    };
    assert_eq!(message, "name is required");
}

#[tokio::test]
async fn wipe_counts_partial_failures_and_leaves_mixed_state() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");

    session
        .create_lead(&lead_draft("Anna", "website"))
        .await
        .expect("create");
    // One lead + one lead_created history row are now stored.
    let before = session.data().await.expect("data");
    assert_eq!(before.leads.len(), 1);
    assert_eq!(before.activities.len(), 1);

    store.fail_next("activities", 1);
    let report = session.wipe().await.expect("wipe");
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 1);

    // The failed delete left its record behind; nothing retried it.
    let leftover = store
        .list("activities", &ListQuery::new())
        .await
        .expect("list");
    assert_eq!(leftover.len(), 1);
}

#[tokio::test]
async fn settings_round_trip_through_the_singleton() {
    let store = Arc::new(MemoryStore::new());
    let session = session_on(&store, "u-1");

    let defaults = session.settings().await.expect("settings");
    assert_eq!(defaults.id, None);
    assert_eq!(defaults.currency, Currency::Rub);
    assert_eq!(defaults.data_retention_days, 365);

    let mut changed = defaults;
    changed.company_name = "Acme LLC".into();
    changed.currency = Currency::Eur;
    let saved = session.save_settings(changed).await.expect("save");
    assert!(saved.id.is_some());

    let reloaded = session.settings().await.expect("settings");
    assert_eq!(reloaded.company_name, "Acme LLC");
    assert_eq!(reloaded.currency, Currency::Eur);
    assert_eq!(reloaded.id, saved.id);

    // Second save updates the same record instead of creating another.
    let mut again = reloaded;
    again.data_retention_days = 90;
    session.save_settings(again).await.expect("save");
    let rows = store
        .list("user_settings", &ListQuery::new())
        .await
        .expect("list");
    assert_eq!(rows.len(), 1);
}
