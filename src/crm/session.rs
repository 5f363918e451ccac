//! Per-user CRM session.
//!
//! One session owns the signed-in user's view of the store: typed
//! repositories, a cache of all four collections, and the activity log.
//! Pages (CLI commands) share the cache instead of re-fetching per screen;
//! mutations invalidate it in place.
//!
//! Loads are a parallel fan-out of the four list calls. Each load carries a
//! generation tag; results of a load that was superseded while in flight
//! are discarded rather than overwriting newer state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::json;
use tokio::sync::RwLock;

use crate::auth::User;
use crate::error::StoreError;
use crate::form::{ClientDraft, DealDraft, LeadDraft};
use crate::store::{ListQuery, RecordStore};

use super::activity::{ActivityLog, FlushReport, LogOutcome};
use super::repo::{Entity, Repository};
use super::types::{
    Activity, ActivityKind, Client, Deal, DealStage, EntityKind, EntityRef, Lead, UserSettings,
};

/// The user's full loaded record sets, newest first.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub leads: Vec<Lead>,
    pub clients: Vec<Client>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
}

/// Outcome of the bulk wipe. Failures are counted, not retried; a partial
/// wipe leaves a mixed state, same as the source system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WipeReport {
    pub deleted: usize,
    pub failed: usize,
}

pub struct Session {
    user: User,
    leads: Repository<Lead>,
    clients: Repository<Client>,
    deals: Repository<Deal>,
    settings: Repository<UserSettings>,
    log: ActivityLog,
    activities: Repository<Activity>,
    cache: RwLock<Option<Snapshot>>,
    load_generation: AtomicU64,
}

impl Session {
    pub fn new(store: Arc<dyn RecordStore>, user: User) -> Self {
        let owner = user.id.clone();
        Self {
            leads: Repository::new(store.clone(), owner.clone()),
            clients: Repository::new(store.clone(), owner.clone()),
            deals: Repository::new(store.clone(), owner.clone()),
            settings: Repository::new(store.clone(), owner.clone()),
            activities: Repository::new(store.clone(), owner.clone()),
            log: ActivityLog::new(store, owner),
            user,
            cache: RwLock::new(None),
            load_generation: AtomicU64::new(0),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Load all four collections in parallel. Returns `false` when a newer
    /// load superseded this one and its results were discarded.
    pub async fn load(&self) -> Result<bool, StoreError> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (leads, clients, deals, activities) = tokio::try_join!(
            self.leads.list_newest_first(),
            self.clients.list_newest_first(),
            self.deals.list_newest_first(),
            self.activities.list_newest_first(),
        )?;

        let mut cache = self.cache.write().await;
        if self.load_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding results of superseded load");
            return Ok(false);
        }
        *cache = Some(Snapshot {
            leads,
            clients,
            deals,
            activities,
        });
        Ok(true)
    }

    /// Cached snapshot, loading on first use.
    pub async fn data(&self) -> Result<Snapshot, StoreError> {
        if let Some(snapshot) = self.cache.read().await.clone() {
            return Ok(snapshot);
        }
        self.load().await?;
        Ok(self.cache.read().await.clone().unwrap_or_default())
    }

    /// Deliver deferred history entries, then record one for the mutation
    /// that just succeeded.
    async fn log_tracked(
        &self,
        kind: ActivityKind,
        description: String,
        entity: EntityRef,
    ) -> LogOutcome {
        self.log.flush().await;
        let outcome = self.log.record(kind, description, Some(entity)).await;
        if let LogOutcome::Written = outcome {
            self.invalidate_activities().await;
        }
        outcome
    }

    async fn invalidate_activities(&self) {
        if let Ok(activities) = self.activities.list_newest_first().await {
            let mut cache = self.cache.write().await;
            if let Some(snapshot) = cache.as_mut() {
                snapshot.activities = activities;
            }
        }
    }

    /// Retry queued history entries.
    pub async fn flush_history(&self) -> FlushReport {
        self.log.flush().await
    }

    pub fn pending_history(&self) -> usize {
        self.log.pending()
    }

    // ---- leads ----

    pub async fn find_lead(&self, id: &str) -> Result<Lead, StoreError> {
        self.data()
            .await?
            .leads
            .into_iter()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::not_found(Lead::COLLECTION, id))
    }

    /// Create a lead from a validated draft. The caller (form controller)
    /// has already gated on `validate`.
    pub async fn create_lead(&self, draft: &LeadDraft) -> Result<(Lead, LogOutcome), StoreError> {
        let now = Utc::now();
        let lead = Lead {
            id: String::new(),
            owner_id: self.user.id.clone(),
            name: draft.name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.clone(),
            company: draft.company.clone(),
            position: draft.position.clone(),
            source: draft.source.clone(),
            status: draft.status,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let created = self.leads.create(&lead).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.leads.insert(0, created.clone());
        }
        let outcome = self
            .log_tracked(
                ActivityKind::LeadCreated,
                format!("Created lead: {}", created.name),
                EntityRef::new(EntityKind::Lead, created.id.clone()),
            )
            .await;
        Ok((created, outcome))
    }

    pub async fn update_lead(
        &self,
        id: &str,
        draft: &LeadDraft,
    ) -> Result<(Lead, LogOutcome), StoreError> {
        let mut updated = self.find_lead(id).await?;
        updated.name = draft.name.trim().to_string();
        updated.email = draft.email.trim().to_string();
        updated.phone = draft.phone.clone();
        updated.company = draft.company.clone();
        updated.position = draft.position.clone();
        updated.source = draft.source.clone();
        updated.status = draft.status;
        updated.notes = draft.notes.clone();
        updated.updated_at = Utc::now();

        self.leads
            .update(id, serde_json::to_value(&updated)?)
            .await?;

        if let Some(snapshot) = self.cache.write().await.as_mut()
            && let Some(slot) = snapshot.leads.iter_mut().find(|l| l.id == id)
        {
            *slot = updated.clone();
        }
        let outcome = self
            .log_tracked(
                ActivityKind::LeadUpdated,
                format!("Updated lead: {}", updated.name),
                EntityRef::new(EntityKind::Lead, updated.id.clone()),
            )
            .await;
        Ok((updated, outcome))
    }

    pub async fn delete_lead(&self, id: &str) -> Result<LogOutcome, StoreError> {
        let lead = self.find_lead(id).await?;
        self.leads.delete(id).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.leads.retain(|l| l.id != id);
        }
        Ok(self
            .log_tracked(
                ActivityKind::LeadDeleted,
                format!("Deleted lead: {}", lead.name),
                EntityRef::new(EntityKind::Lead, id),
            )
            .await)
    }

    // ---- clients ----

    pub async fn find_client(&self, id: &str) -> Result<Client, StoreError> {
        self.data()
            .await?
            .clients
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(Client::COLLECTION, id))
    }

    pub async fn create_client(
        &self,
        draft: &ClientDraft,
    ) -> Result<(Client, LogOutcome), StoreError> {
        let now = Utc::now();
        let client = Client {
            id: String::new(),
            owner_id: self.user.id.clone(),
            name: draft.name.trim().to_string(),
            email: draft.email.trim().to_string(),
            phone: draft.phone.clone(),
            company: draft.company.clone(),
            position: draft.position.clone(),
            address: draft.address.clone(),
            status: draft.status,
            total_value: draft.total_value,
            last_contact: draft.last_contact,
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let created = self.clients.create(&client).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.clients.insert(0, created.clone());
        }
        let outcome = self
            .log_tracked(
                ActivityKind::ClientCreated,
                format!("Created client: {}", created.name),
                EntityRef::new(EntityKind::Client, created.id.clone()),
            )
            .await;
        Ok((created, outcome))
    }

    pub async fn update_client(
        &self,
        id: &str,
        draft: &ClientDraft,
    ) -> Result<(Client, LogOutcome), StoreError> {
        let mut updated = self.find_client(id).await?;
        updated.name = draft.name.trim().to_string();
        updated.email = draft.email.trim().to_string();
        updated.phone = draft.phone.clone();
        updated.company = draft.company.clone();
        updated.position = draft.position.clone();
        updated.address = draft.address.clone();
        updated.status = draft.status;
        updated.total_value = draft.total_value;
        updated.last_contact = draft.last_contact;
        updated.notes = draft.notes.clone();
        updated.updated_at = Utc::now();

        self.clients
            .update(id, serde_json::to_value(&updated)?)
            .await?;

        if let Some(snapshot) = self.cache.write().await.as_mut()
            && let Some(slot) = snapshot.clients.iter_mut().find(|c| c.id == id)
        {
            *slot = updated.clone();
        }
        let outcome = self
            .log_tracked(
                ActivityKind::ClientUpdated,
                format!("Updated client: {}", updated.name),
                EntityRef::new(EntityKind::Client, updated.id.clone()),
            )
            .await;
        Ok((updated, outcome))
    }

    pub async fn delete_client(&self, id: &str) -> Result<LogOutcome, StoreError> {
        let client = self.find_client(id).await?;
        self.clients.delete(id).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.clients.retain(|c| c.id != id);
        }
        Ok(self
            .log_tracked(
                ActivityKind::ClientDeleted,
                format!("Deleted client: {}", client.name),
                EntityRef::new(EntityKind::Client, id),
            )
            .await)
    }

    // ---- deals ----

    pub async fn find_deal(&self, id: &str) -> Result<Deal, StoreError> {
        self.data()
            .await?
            .deals
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::not_found(Deal::COLLECTION, id))
    }

    pub async fn create_deal(&self, draft: &DealDraft) -> Result<(Deal, LogOutcome), StoreError> {
        let now = Utc::now();
        let deal = Deal {
            id: String::new(),
            owner_id: self.user.id.clone(),
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            value: draft.value,
            stage: draft.stage,
            probability: draft.probability,
            expected_close_date: draft.expected_close_date,
            lead_id: draft.lead_id.clone(),
            client_id: draft.client_id.clone(),
            notes: draft.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let created = self.deals.create(&deal).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.deals.insert(0, created.clone());
        }
        let outcome = self
            .log_tracked(
                ActivityKind::DealCreated,
                format!("Created deal: {}", created.title),
                created.entity_ref(),
            )
            .await;
        Ok((created, outcome))
    }

    pub async fn update_deal(
        &self,
        id: &str,
        draft: &DealDraft,
    ) -> Result<(Deal, LogOutcome), StoreError> {
        let mut updated = self.find_deal(id).await?;
        updated.title = draft.title.trim().to_string();
        updated.description = draft.description.clone();
        updated.value = draft.value;
        updated.stage = draft.stage;
        updated.probability = draft.probability;
        updated.expected_close_date = draft.expected_close_date;
        updated.lead_id = draft.lead_id.clone();
        updated.client_id = draft.client_id.clone();
        updated.notes = draft.notes.clone();
        updated.updated_at = Utc::now();

        self.deals
            .update(id, serde_json::to_value(&updated)?)
            .await?;

        if let Some(snapshot) = self.cache.write().await.as_mut()
            && let Some(slot) = snapshot.deals.iter_mut().find(|d| d.id == id)
        {
            *slot = updated.clone();
        }
        let outcome = self
            .log_tracked(
                ActivityKind::DealUpdated,
                format!("Updated deal: {}", updated.title),
                updated.entity_ref(),
            )
            .await;
        Ok((updated, outcome))
    }

    /// Move a deal to another stage. Any stage may follow any stage.
    pub async fn set_deal_stage(
        &self,
        id: &str,
        stage: DealStage,
    ) -> Result<(Deal, LogOutcome), StoreError> {
        let mut updated = self.find_deal(id).await?;
        updated.stage = stage;
        updated.updated_at = Utc::now();

        self.deals
            .update(
                id,
                json!({ "stage": stage, "updated_at": updated.updated_at }),
            )
            .await?;

        if let Some(snapshot) = self.cache.write().await.as_mut()
            && let Some(slot) = snapshot.deals.iter_mut().find(|d| d.id == id)
        {
            *slot = updated.clone();
        }
        let outcome = self
            .log_tracked(
                ActivityKind::DealStageChanged,
                format!("Deal \"{}\" moved to \"{}\"", updated.title, stage.label()),
                updated.entity_ref(),
            )
            .await;
        Ok((updated, outcome))
    }

    pub async fn delete_deal(&self, id: &str) -> Result<LogOutcome, StoreError> {
        let deal = self.find_deal(id).await?;
        self.deals.delete(id).await?;

        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.deals.retain(|d| d.id != id);
        }
        Ok(self
            .log_tracked(
                ActivityKind::DealDeleted,
                format!("Deleted deal: {}", deal.title),
                EntityRef::new(EntityKind::Deal, id),
            )
            .await)
    }

    // ---- activities ----

    /// Record a user-entered activity. This is a primary action, so store
    /// failures propagate instead of going through the outbox.
    pub async fn log_activity(
        &self,
        kind: ActivityKind,
        title: Option<String>,
        description: String,
        entity: Option<EntityRef>,
    ) -> Result<Activity, StoreError> {
        let created = self.log.record_manual(kind, title, description, entity).await?;
        if let Some(snapshot) = self.cache.write().await.as_mut() {
            snapshot.activities.insert(0, created.clone());
        }
        Ok(created)
    }

    // ---- settings ----

    /// The user's settings record, or defaults when none was saved yet.
    pub async fn settings(&self) -> Result<UserSettings, StoreError> {
        let mut rows = self.settings.list(ListQuery::new().limit(1)).await?;
        Ok(rows
            .pop()
            .unwrap_or_else(|| UserSettings::defaults_for(&self.user.id)))
    }

    pub async fn save_settings(
        &self,
        mut settings: UserSettings,
    ) -> Result<UserSettings, StoreError> {
        let now = Utc::now();
        settings.owner_id = self.user.id.clone();
        settings.updated_at = Some(now);
        match settings.id.clone() {
            Some(id) => {
                self.settings
                    .update(&id, serde_json::to_value(&settings)?)
                    .await?;
                Ok(settings)
            }
            None => {
                settings.created_at = Some(now);
                self.settings.create(&settings).await
            }
        }
    }

    // ---- wipe ----

    /// Delete every record in all four collections, one concurrent delete
    /// per record. No batching, no rollback; failures are only counted.
    pub async fn wipe(&self) -> Result<WipeReport, StoreError> {
        let snapshot = self.data().await?;

        let mut deletes: Vec<BoxFuture<'_, Result<(), StoreError>>> = Vec::new();
        for lead in &snapshot.leads {
            deletes.push(self.leads.delete(&lead.id).boxed());
        }
        for client in &snapshot.clients {
            deletes.push(self.clients.delete(&client.id).boxed());
        }
        for deal in &snapshot.deals {
            deletes.push(self.deals.delete(&deal.id).boxed());
        }
        for activity in &snapshot.activities {
            deletes.push(self.activities.delete(&activity.id).boxed());
        }

        let mut report = WipeReport::default();
        for result in futures::future::join_all(deletes).await {
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::error!(error = %e, "wipe: delete failed");
                    report.failed += 1;
                }
            }
        }

        // The cache no longer reflects the store; reload lazily.
        *self.cache.write().await = None;
        Ok(report)
    }
}
