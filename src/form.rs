//! Entity drafts and form controllers.
//!
//! A form holds one draft mirroring the entity's editable fields. Required
//! fields gate submission: an invalid draft never reaches the store. On
//! success the session merges the result into its cache (prepend for
//! create, replace-in-place for update) and the draft resets; on failure
//! the draft is kept so the user can retry.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::crm::session::Session;
use crate::crm::types::{Client, ClientStatus, Deal, DealStage, Lead, LeadStatus, UserSettings};
use crate::crm::LogOutcome;
use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected client-side; no store call was issued.
    #[error("validation failed: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn require(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LeadDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    pub notes: Option<String>,
}

impl Default for LeadDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: None,
            company: None,
            position: None,
            source: crate::crm::types::LEAD_SOURCES[0].to_string(),
            status: LeadStatus::New,
            notes: None,
        }
    }
}

impl LeadDraft {
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            company: lead.company.clone(),
            position: lead.position.clone(),
            source: lead.source.clone(),
            status: lead.status,
            notes: lead.notes.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "name")?;
        require(&self.email, "email")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClientDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub address: Option<String>,
    pub status: ClientStatus,
    pub total_value: Decimal,
    pub last_contact: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Default for ClientDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: None,
            company: None,
            position: None,
            address: None,
            status: ClientStatus::Active,
            total_value: Decimal::ZERO,
            last_contact: None,
            notes: None,
        }
    }
}

impl ClientDraft {
    pub fn from_client(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            company: client.company.clone(),
            position: client.position.clone(),
            address: client.address.clone(),
            status: client.status,
            total_value: client.total_value,
            last_contact: client.last_contact,
            notes: client.notes.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "name")?;
        require(&self.email, "email")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DealDraft {
    pub title: String,
    pub description: String,
    pub value: Decimal,
    pub stage: DealStage,
    pub probability: u8,
    pub expected_close_date: Option<NaiveDate>,
    pub lead_id: Option<String>,
    pub client_id: Option<String>,
    pub notes: Option<String>,
}

impl Default for DealDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            value: Decimal::ZERO,
            stage: DealStage::New,
            probability: 50,
            expected_close_date: None,
            lead_id: None,
            client_id: None,
            notes: None,
        }
    }
}

impl DealDraft {
    pub fn from_deal(deal: &Deal) -> Self {
        Self {
            title: deal.title.clone(),
            description: deal.description.clone(),
            value: deal.value,
            stage: deal.stage,
            probability: deal.probability,
            expected_close_date: deal.expected_close_date,
            lead_id: deal.lead_id.clone(),
            client_id: deal.client_id.clone(),
            notes: deal.notes.clone(),
        }
    }

    /// Reference a lead. Clears any client reference — a deal points at one
    /// contact, not both.
    pub fn set_lead(&mut self, lead_id: impl Into<String>) {
        self.lead_id = Some(lead_id.into());
        self.client_id = None;
    }

    /// Reference a client. Clears any lead reference.
    pub fn set_client(&mut self, client_id: impl Into<String>) {
        self.client_id = Some(client_id.into());
        self.lead_id = None;
    }

    pub fn validate(&self) -> Result<(), String> {
        require(&self.title, "title")?;
        if self.value <= Decimal::ZERO {
            return Err("value must be greater than 0".to_string());
        }
        if self.probability > 100 {
            return Err("probability must be between 0 and 100".to_string());
        }
        if self.lead_id.is_some() && self.client_id.is_some() {
            return Err("a deal may reference a lead or a client, not both".to_string());
        }
        Ok(())
    }
}

/// Range the settings form accepts for retention, matching the original
/// input bounds. The value is stored but never acted on.
pub const RETENTION_DAYS_RANGE: std::ops::RangeInclusive<u32> = 30..=3650;

pub fn validate_settings(settings: &UserSettings) -> Result<(), String> {
    if !RETENTION_DAYS_RANGE.contains(&settings.data_retention_days) {
        return Err(format!(
            "data_retention_days must be between {} and {}",
            RETENTION_DAYS_RANGE.start(),
            RETENTION_DAYS_RANGE.end()
        ));
    }
    Ok(())
}

macro_rules! form_controller {
    ($form:ident, $draft:ty, $entity:ty, $prefill:ident, $create:ident, $update:ident) => {
        /// Create/edit controller: one draft plus the id being edited, if
        /// any. `submit` validates before anything touches the store.
        #[derive(Debug, Default)]
        pub struct $form {
            pub draft: $draft,
            editing: Option<String>,
        }

        impl $form {
            pub fn create() -> Self {
                Self::default()
            }

            pub fn edit(record: &$entity) -> Self {
                Self {
                    draft: <$draft>::$prefill(record),
                    editing: Some(record.id.clone()),
                }
            }

            pub fn editing(&self) -> Option<&str> {
                self.editing.as_deref()
            }

            /// Mirror of the dialog's disabled submit button.
            pub fn can_submit(&self) -> bool {
                self.draft.validate().is_ok()
            }

            /// Validate, dispatch create or update, and reset the draft on
            /// success. An invalid draft returns before any store call.
            pub async fn submit(
                &mut self,
                session: &Session,
            ) -> Result<($entity, LogOutcome), SubmitError> {
                self.draft.validate().map_err(SubmitError::Invalid)?;
                let result = match self.editing.as_deref() {
                    Some(id) => session.$update(id, &self.draft).await?,
                    None => session.$create(&self.draft).await?,
                };
                self.draft = <$draft>::default();
                self.editing = None;
                Ok(result)
            }
        }
    };
}

form_controller!(LeadForm, LeadDraft, Lead, from_lead, create_lead, update_lead);
form_controller!(ClientForm, ClientDraft, Client, from_client, create_client, update_client);
form_controller!(DealForm, DealDraft, Deal, from_deal, create_deal, update_deal);
