//! CRM record types.
//!
//! Every record is owned by exactly one user (`owner_id`) and carries
//! store-assigned string ids plus client-set timestamps. Currency amounts
//! are `Decimal`; `total_value` on a client and `value` on a deal are
//! independent, manually maintained fields — nothing derives one from the
//! other.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Suggested lead sources. `Lead::source` stays free-form; this palette only
/// seeds pickers and defaults.
pub const LEAD_SOURCES: [&str; 5] = [
    "website",
    "advertising",
    "social_media",
    "referral",
    "cold_call",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl LeadStatus {
    pub const ALL: [Self; 7] = [
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed (won)",
            Self::ClosedLost => "Closed (lost)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
    Prospect,
}

impl ClientStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Inactive, Self::Prospect];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Prospect => "prospect",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::Prospect => "Prospect",
        }
    }
}

/// Pipeline stage of a deal. Any stage may follow any stage — there is no
/// transition table.
///
/// Foreign rows may carry stage strings outside this set; they decode to
/// [`DealStage::Unknown`] so a single odd record cannot poison a whole list
/// call. `Unknown` is not part of [`DealStage::BOARD`] and therefore appears
/// in no kanban column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    New,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
    #[serde(other)]
    Unknown,
}

impl DealStage {
    /// Fixed board column order.
    pub const BOARD: [Self; 6] = [
        Self::New,
        Self::Qualified,
        Self::Proposal,
        Self::Negotiation,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed_won",
            Self::ClosedLost => "closed_lost",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::BOARD.into_iter().find(|s| s.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Qualified => "Qualified",
            Self::Proposal => "Proposal",
            Self::Negotiation => "Negotiation",
            Self::ClosedWon => "Closed (won)",
            Self::ClosedLost => "Closed (lost)",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

/// Kind of an activity entry. User kinds come from the `activities log`
/// command; the synthetic kinds are emitted by the activity log after each
/// tracked mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Call,
    Email,
    Meeting,
    Note,
    Task,
    LeadCreated,
    LeadUpdated,
    LeadDeleted,
    ClientCreated,
    ClientUpdated,
    ClientDeleted,
    DealCreated,
    DealUpdated,
    DealDeleted,
    DealStageChanged,
    #[serde(other)]
    Other,
}

impl ActivityKind {
    /// Kinds a user can record by hand.
    pub const USER: [Self; 5] = [Self::Call, Self::Email, Self::Meeting, Self::Note, Self::Task];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Email => "email",
            Self::Meeting => "meeting",
            Self::Note => "note",
            Self::Task => "task",
            Self::LeadCreated => "lead_created",
            Self::LeadUpdated => "lead_updated",
            Self::LeadDeleted => "lead_deleted",
            Self::ClientCreated => "client_created",
            Self::ClientUpdated => "client_updated",
            Self::ClientDeleted => "client_deleted",
            Self::DealCreated => "deal_created",
            Self::DealUpdated => "deal_updated",
            Self::DealDeleted => "deal_deleted",
            Self::DealStageChanged => "deal_stage_changed",
            Self::Other => "other",
        }
    }

    /// Parse one of the user-recordable kinds. Synthetic kinds are only
    /// ever produced by the logger, never typed in.
    pub fn from_user_value(value: &str) -> Option<Self> {
        Self::USER.into_iter().find(|k| k.as_str() == value)
    }

    /// Human label: snake_case with spaces, as the source UI rendered it.
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Which entity an activity entry points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Lead,
    Client,
    Deal,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Client => "client",
            Self::Deal => "deal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rub,
    Usd,
    Eur,
}

impl Currency {
    pub const ALL: [Self; 3] = [Self::Rub, Self::Usd, Self::Eur];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rub => "RUB",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Rub => "₽",
            Self::Usd => "$",
            Self::Eur => "€",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub status: ClientStatus,
    /// Client-entered lifetime value. Never derived from won deals.
    pub total_value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub value: Decimal,
    pub stage: DealStage,
    /// 0–100, freely editable; not derived from the stage.
    pub probability: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_close_date: Option<NaiveDate>,
    /// At most one of `lead_id`/`client_id` is set — a convention the forms
    /// maintain, not something storage enforces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(EntityKind::Deal, self.id.clone())
    }
}

/// Append-only history entry. Nothing updates or deletes these except the
/// bulk wipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub owner_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn entity_ref(&self) -> Option<EntityRef> {
        match (self.entity_type, &self.entity_id) {
            (Some(kind), Some(id)) => Some(EntityRef::new(kind, id.clone())),
            _ => None,
        }
    }
}

/// Singleton-per-user preferences record.
///
/// `data_retention_days` is stored and editable but never enforced — no
/// purge logic exists anywhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_address: String,
    #[serde(default)]
    pub company_phone: String,
    #[serde(default)]
    pub company_email: String,
    pub currency: Currency,
    pub timezone: String,
    pub language: String,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub deal_reminders: bool,
    pub lead_auto_assignment: bool,
    pub data_retention_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    pub fn defaults_for(owner_id: &str) -> Self {
        Self {
            id: None,
            owner_id: owner_id.to_string(),
            company_name: String::new(),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: String::new(),
            currency: Currency::Rub,
            timezone: "Europe/Moscow".to_string(),
            language: "ru".to_string(),
            email_notifications: true,
            push_notifications: true,
            deal_reminders: true,
            lead_auto_assignment: false,
            data_retention_days: 365,
            created_at: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_stage_round_trips_through_store_values() {
        for stage in DealStage::BOARD {
            assert_eq!(DealStage::from_value(stage.as_str()), Some(stage));
        }
        assert_eq!(DealStage::from_value("unknown"), None);
    }

    #[test]
    fn unknown_stage_string_decodes_to_unknown_variant() {
        let stage: DealStage = serde_json::from_str("\"prospecting\"").expect("decode");
        assert_eq!(stage, DealStage::Unknown);
    }

    #[test]
    fn activity_kind_serializes_as_type_field() {
        let activity = Activity {
            id: "a-1".into(),
            owner_id: "u-1".into(),
            kind: ActivityKind::DealStageChanged,
            title: None,
            description: "Deal moved".into(),
            entity_type: Some(EntityKind::Deal),
            entity_id: Some("d-1".into()),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&activity).expect("serialize");
        assert_eq!(value["type"], "deal_stage_changed");
        assert_eq!(value["entity_type"], "deal");
    }

    #[test]
    fn foreign_activity_kind_decodes_to_other() {
        let kind: ActivityKind = serde_json::from_str("\"webhook_fired\"").expect("decode");
        assert_eq!(kind, ActivityKind::Other);
    }
}
