//! JSON data export.
//!
//! One document with the user, their settings, all four record sets, and
//! summary statistics, written to a local file. There is no import
//! counterpart.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::User;
use crate::crm::Snapshot;
use crate::crm::types::{Activity, Client, Deal, Lead, UserSettings};
use crate::error::ExportError;

#[derive(Debug, Serialize)]
pub struct ExportUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportData {
    pub leads: Vec<Lead>,
    pub clients: Vec<Client>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
pub struct ExportStatistics {
    pub total_leads: usize,
    pub total_clients: usize,
    pub total_deals: usize,
    pub total_activities: usize,
    /// Sum over all deals, regardless of stage.
    pub total_deal_value: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub export_date: DateTime<Utc>,
    pub user: ExportUser,
    pub settings: UserSettings,
    pub data: ExportData,
    pub statistics: ExportStatistics,
}

impl ExportDocument {
    pub fn build(
        user: &User,
        settings: UserSettings,
        snapshot: Snapshot,
        exported_at: DateTime<Utc>,
    ) -> Self {
        let statistics = ExportStatistics {
            total_leads: snapshot.leads.len(),
            total_clients: snapshot.clients.len(),
            total_deals: snapshot.deals.len(),
            total_activities: snapshot.activities.len(),
            total_deal_value: snapshot
                .deals
                .iter()
                .fold(Decimal::ZERO, |acc, d| acc + d.value),
        };
        Self {
            export_date: exported_at,
            user: ExportUser {
                id: user.id.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
            },
            settings,
            data: ExportData {
                leads: snapshot.leads,
                clients: snapshot.clients,
                deals: snapshot.deals,
                activities: snapshot.activities,
            },
            statistics,
        }
    }

    /// Pretty-print to `path`.
    pub fn write_file(&self, path: &Path) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `crm-export-YYYY-MM-DD.json`, same pattern the source used for the
/// download name.
pub fn default_file_name(date: NaiveDate) -> String {
    format!("crm-export-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn demo_user() -> User {
        User {
            id: "u-1".into(),
            email: "u@example.com".into(),
            display_name: None,
            created_at: None,
        }
    }

    #[test]
    fn empty_export_is_valid_json_with_zero_statistics() {
        let doc = ExportDocument::build(
            &demo_user(),
            UserSettings::defaults_for("u-1"),
            Snapshot::default(),
            Utc::now(),
        );
        let json = serde_json::to_string(&doc).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("round trip");

        assert_eq!(value["data"]["leads"], serde_json::json!([]));
        assert_eq!(value["data"]["activities"], serde_json::json!([]));
        assert_eq!(value["statistics"]["total_leads"], 0);
        assert_eq!(value["statistics"]["total_deal_value"], "0");
    }

    #[test]
    fn file_name_carries_the_date() {
        let date = chrono::NaiveDate::from_ymd_opt(2026, 8, 7).expect("date");
        assert_eq!(default_file_name(date), "crm-export-2026-08-07.json");
    }

    #[test]
    fn write_file_produces_readable_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("export.json");
        let doc = ExportDocument::build(
            &demo_user(),
            UserSettings::defaults_for("u-1"),
            Snapshot::default(),
            Utc::now(),
        );

        doc.write_file(&path).expect("write");
        let raw = std::fs::read_to_string(&path).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["user"]["id"], "u-1");
    }
}
