//! Denormalized activity history.
//!
//! Every tracked mutation is followed by a history write. The write is
//! best-effort and deliberately not atomic with the primary mutation: if it
//! fails after the primary change persisted, the change stays and the
//! history entry is missing until a later flush delivers it. That window is
//! accepted behavior.
//!
//! Failed entries go to an in-memory outbox and are retried on subsequent
//! flushes, up to [`MAX_ATTEMPTS`]; the final drop is surfaced to the caller
//! so it can warn the user instead of disappearing into the log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::StoreError;
use crate::store::RecordStore;

use super::repo::Repository;
use super::types::{Activity, ActivityKind, EntityRef};

/// Total delivery attempts per entry, the initial write included.
pub const MAX_ATTEMPTS: u32 = 3;

/// What happened to a single history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Stored on the first attempt.
    Written,
    /// Store failure; queued for retry on the next flush.
    Deferred,
    /// Given up. The primary mutation has no history entry.
    Dropped,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub deferred: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    entry: Activity,
    attempts: u32,
}

pub struct ActivityLog {
    repo: Repository<Activity>,
    outbox: Mutex<VecDeque<PendingEntry>>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn RecordStore>, owner_id: impl Into<String>) -> Self {
        Self {
            repo: Repository::new(store, owner_id),
            outbox: Mutex::new(VecDeque::new()),
        }
    }

    fn draft(&self, kind: ActivityKind, description: String, entity: Option<EntityRef>) -> Activity {
        Activity {
            id: String::new(),
            owner_id: self.repo.owner_id().to_string(),
            kind,
            title: None,
            description,
            entity_type: entity.as_ref().map(|r| r.kind),
            entity_id: entity.map(|r| r.id),
            created_at: Utc::now(),
        }
    }

    /// Record a history entry for a completed mutation. Never fails the
    /// caller; the outcome says whether a warning is due.
    pub async fn record(
        &self,
        kind: ActivityKind,
        description: String,
        entity: Option<EntityRef>,
    ) -> LogOutcome {
        let entry = self.draft(kind, description, entity);
        match self.repo.create(&entry).await {
            Ok(_) => LogOutcome::Written,
            Err(e) => self.handle_failure(entry, 1, &e),
        }
    }

    /// Record a user-entered activity (`call`, `meeting`, ...). Unlike the
    /// synthetic entries these are a primary action, so failures propagate.
    pub async fn record_manual(
        &self,
        kind: ActivityKind,
        title: Option<String>,
        description: String,
        entity: Option<EntityRef>,
    ) -> Result<Activity, StoreError> {
        let mut entry = self.draft(kind, description, entity);
        entry.title = title;
        self.repo.create(&entry).await
    }

    fn handle_failure(&self, entry: Activity, attempts: u32, error: &StoreError) -> LogOutcome {
        if error.is_transient() && attempts < MAX_ATTEMPTS {
            tracing::warn!(
                kind = entry.kind.as_str(),
                attempts,
                error = %error,
                "history write failed, queued for retry"
            );
            self.outbox
                .lock()
                .expect("activity outbox lock")
                .push_back(PendingEntry { entry, attempts });
            LogOutcome::Deferred
        } else {
            tracing::warn!(
                kind = entry.kind.as_str(),
                attempts,
                error = %error,
                "history entry dropped; primary change has no history row"
            );
            LogOutcome::Dropped
        }
    }

    /// Retry queued entries. Called after each successful mutation and from
    /// the CLI before exit. Stops early when the store looks down.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        let batch = self.outbox.lock().expect("activity outbox lock").len();

        for _ in 0..batch {
            let Some(pending) = self
                .outbox
                .lock()
                .expect("activity outbox lock")
                .pop_front()
            else {
                break;
            };

            match self.repo.create(&pending.entry).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    let transient = e.is_transient();
                    match self.handle_failure(pending.entry, pending.attempts + 1, &e) {
                        LogOutcome::Deferred => report.deferred += 1,
                        LogOutcome::Dropped => report.dropped += 1,
                        LogOutcome::Written => unreachable!("failure cannot report written"),
                    }
                    if transient {
                        // Store is unreachable; later entries would fail too.
                        break;
                    }
                }
            }
        }

        let remaining = self.outbox.lock().expect("activity outbox lock").len();
        report.deferred = remaining;
        report
    }

    /// Entries still waiting for delivery.
    pub fn pending(&self) -> usize {
        self.outbox.lock().expect("activity outbox lock").len()
    }
}
