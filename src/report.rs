//! Analytics aggregation.
//!
//! Pure computation over the session's loaded record sets. Everything is
//! recomputed per invocation from the full datasets; there is no incremental
//! aggregation to keep in sync.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::crm::Snapshot;
use crate::crm::types::{Activity, ActivityKind, DealStage, LeadStatus};
use crate::view::series::{DayBucket, TimeWindow, daily_series};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageBreakdown {
    pub stage: DealStage,
    pub count: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub window: TimeWindow,

    // Window-filtered headline metrics.
    pub leads_in_window: usize,
    pub clients_in_window: usize,
    pub deals_in_window: usize,
    pub total_value: Decimal,
    pub won_value: Decimal,
    pub lost_value: Decimal,
    pub won_count: usize,
    pub lost_count: usize,
    /// Win rate in percent. Defined as 0 when no closed deals exist.
    pub win_rate: f64,
    pub average_deal_value: Decimal,
    /// Clients-in-window over leads-in-window, in percent. Not a true
    /// funnel — the clients are not proven to come from those leads.
    pub conversion_rate: f64,

    // Whole-dataset breakdowns, as the source screen computed them.
    pub total_leads: usize,
    pub total_clients: usize,
    pub total_deals: usize,
    pub total_activities: usize,
    pub open_deals: usize,
    pub by_stage: Vec<StageBreakdown>,
    pub lead_sources: Vec<(String, usize)>,
    pub lead_statuses: Vec<(LeadStatus, usize)>,
    pub activity_kinds: Vec<(ActivityKind, usize)>,

    pub series: Vec<DayBucket>,
}

fn sorted_counts<K: Ord>(counts: HashMap<K, usize>) -> Vec<(K, usize)> {
    let mut entries: Vec<(K, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

impl Report {
    /// Build the report as of `now`. Day buckets use `now`'s timezone.
    pub fn build<Tz: TimeZone>(snapshot: &Snapshot, window: TimeWindow, now: DateTime<Tz>) -> Self {
        let cutoff: DateTime<Utc> =
            now.with_timezone(&Utc) - Duration::days(i64::from(window.days()));
        let in_window = |created_at: &DateTime<Utc>| *created_at >= cutoff;

        let window_deals: Vec<_> = snapshot
            .deals
            .iter()
            .filter(|d| in_window(&d.created_at))
            .collect();
        let leads_in_window = snapshot
            .leads
            .iter()
            .filter(|l| in_window(&l.created_at))
            .count();
        let clients_in_window = snapshot
            .clients
            .iter()
            .filter(|c| in_window(&c.created_at))
            .count();

        let total_value = window_deals
            .iter()
            .fold(Decimal::ZERO, |acc, d| acc + d.value);
        let won: Vec<_> = window_deals
            .iter()
            .filter(|d| d.stage == DealStage::ClosedWon)
            .collect();
        let lost: Vec<_> = window_deals
            .iter()
            .filter(|d| d.stage == DealStage::ClosedLost)
            .collect();
        let won_value = won.iter().fold(Decimal::ZERO, |acc, d| acc + d.value);
        let lost_value = lost.iter().fold(Decimal::ZERO, |acc, d| acc + d.value);

        let closed = won.len() + lost.len();
        let win_rate = if closed == 0 {
            0.0
        } else {
            won.len() as f64 / closed as f64 * 100.0
        };
        let average_deal_value = if window_deals.is_empty() {
            Decimal::ZERO
        } else {
            (total_value / Decimal::from(window_deals.len())).round_dp(2)
        };
        let conversion_rate = if leads_in_window == 0 {
            0.0
        } else {
            clients_in_window as f64 / leads_in_window as f64 * 100.0
        };

        let by_stage = DealStage::BOARD
            .into_iter()
            .map(|stage| {
                let of_stage: Vec<_> =
                    window_deals.iter().filter(|d| d.stage == stage).collect();
                StageBreakdown {
                    stage,
                    count: of_stage.len(),
                    value: of_stage.iter().fold(Decimal::ZERO, |acc, d| acc + d.value),
                }
            })
            .collect();

        let mut source_counts: HashMap<String, usize> = HashMap::new();
        let mut status_counts: HashMap<LeadStatus, usize> = HashMap::new();
        for lead in &snapshot.leads {
            *source_counts.entry(lead.source.clone()).or_default() += 1;
            *status_counts.entry(lead.status).or_default() += 1;
        }
        let mut kind_counts: HashMap<ActivityKind, usize> = HashMap::new();
        for activity in &snapshot.activities {
            *kind_counts.entry(activity.kind).or_default() += 1;
        }

        let mut lead_statuses: Vec<(LeadStatus, usize)> = status_counts.into_iter().collect();
        lead_statuses.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        let mut activity_kinds: Vec<(ActivityKind, usize)> = kind_counts.into_iter().collect();
        activity_kinds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        let series = daily_series(
            &now.timezone(),
            now.date_naive(),
            window,
            &snapshot.leads,
            &snapshot.clients,
            &snapshot.deals,
        );

        Self {
            window,
            leads_in_window,
            clients_in_window,
            deals_in_window: window_deals.len(),
            total_value,
            won_value,
            lost_value,
            won_count: won.len(),
            lost_count: lost.len(),
            win_rate,
            average_deal_value,
            conversion_rate,
            total_leads: snapshot.leads.len(),
            total_clients: snapshot.clients.len(),
            total_deals: snapshot.deals.len(),
            total_activities: snapshot.activities.len(),
            open_deals: snapshot
                .deals
                .iter()
                .filter(|d| !d.stage.is_closed())
                .count(),
            by_stage,
            lead_sources: sorted_counts(source_counts),
            lead_statuses,
            activity_kinds,
            series,
        }
    }
}

/// The dashboard's headline numbers: whole-dataset totals plus the ten most
/// recent history entries.
#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub total_leads: usize,
    pub total_clients: usize,
    pub total_deals: usize,
    /// Value of all closed-won deals, over the full dataset.
    pub total_revenue: Decimal,
    pub recent_activities: Vec<Activity>,
}

impl DashboardSummary {
    pub const RECENT_LIMIT: usize = 10;

    pub fn build(snapshot: &Snapshot) -> Self {
        let total_revenue = snapshot
            .deals
            .iter()
            .filter(|d| d.stage == DealStage::ClosedWon)
            .fold(Decimal::ZERO, |acc, d| acc + d.value);
        Self {
            total_leads: snapshot.leads.len(),
            total_clients: snapshot.clients.len(),
            total_deals: snapshot.deals.len(),
            total_revenue,
            recent_activities: snapshot
                .activities
                .iter()
                .take(Self::RECENT_LIMIT)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::crm::types::{Deal, Lead};

    use super::*;

    fn deal(id: &str, stage: DealStage, value: Decimal, age_days: i64) -> Deal {
        let at = Utc::now() - Duration::days(age_days);
        Deal {
            id: id.to_string(),
            owner_id: "u-1".into(),
            title: id.to_string(),
            description: String::new(),
            value,
            stage,
            probability: 50,
            expected_close_date: None,
            lead_id: None,
            client_id: None,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn lead(id: &str, source: &str, age_days: i64) -> Lead {
        let at = Utc::now() - Duration::days(age_days);
        Lead {
            id: id.to_string(),
            owner_id: "u-1".into(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            phone: None,
            company: None,
            position: None,
            source: source.to_string(),
            status: LeadStatus::New,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn win_rate_is_zero_without_closed_deals() {
        let snapshot = Snapshot {
            deals: vec![deal("d-1", DealStage::New, dec!(500), 1)],
            ..Snapshot::default()
        };
        let report = Report::build(&snapshot, TimeWindow::Days30, Utc::now());
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.deals_in_window, 1);
    }

    #[test]
    fn win_rate_counts_won_over_closed() {
        let snapshot = Snapshot {
            deals: vec![
                deal("d-1", DealStage::ClosedWon, dec!(1000), 1),
                deal("d-2", DealStage::ClosedLost, dec!(400), 2),
                deal("d-3", DealStage::New, dec!(300), 3),
            ],
            ..Snapshot::default()
        };
        let report = Report::build(&snapshot, TimeWindow::Days30, Utc::now());
        assert_eq!(report.win_rate, 50.0);
        assert_eq!(report.won_value, dec!(1000));
        assert_eq!(report.lost_value, dec!(400));
        assert_eq!(report.total_value, dec!(1700));
        assert_eq!(report.average_deal_value, dec!(566.67));
    }

    #[test]
    fn window_excludes_old_records() {
        let snapshot = Snapshot {
            deals: vec![
                deal("d-new", DealStage::ClosedWon, dec!(100), 5),
                deal("d-old", DealStage::ClosedWon, dec!(900), 45),
            ],
            ..Snapshot::default()
        };
        let report = Report::build(&snapshot, TimeWindow::Days30, Utc::now());
        assert_eq!(report.deals_in_window, 1);
        assert_eq!(report.won_value, dec!(100));
        // Whole-dataset totals still see both.
        assert_eq!(report.total_deals, 2);
    }

    #[test]
    fn conversion_rate_guards_against_zero_leads() {
        let report = Report::build(&Snapshot::default(), TimeWindow::Days7, Utc::now());
        assert_eq!(report.conversion_rate, 0.0);
    }

    #[test]
    fn lead_sources_count_the_whole_dataset() {
        let snapshot = Snapshot {
            leads: vec![
                lead("l-1", "website", 2),
                lead("l-2", "website", 400),
                lead("l-3", "сайт", 1),
            ],
            ..Snapshot::default()
        };
        let report = Report::build(&snapshot, TimeWindow::Days7, Utc::now());
        assert_eq!(
            report.lead_sources,
            vec![("website".to_string(), 2), ("сайт".to_string(), 1)]
        );
        assert_eq!(report.leads_in_window, 2);
    }

    #[test]
    fn series_length_matches_window() {
        let report = Report::build(&Snapshot::default(), TimeWindow::Days90, Utc::now());
        assert_eq!(report.series.len(), 90);
    }

    #[test]
    fn dashboard_revenue_and_recent_limit() {
        let mut snapshot = Snapshot {
            deals: vec![
                deal("d-1", DealStage::ClosedWon, dec!(1000), 1),
                deal("d-2", DealStage::New, dec!(700), 1),
            ],
            ..Snapshot::default()
        };
        for i in 0..15 {
            snapshot.activities.push(Activity {
                id: format!("a-{i}"),
                owner_id: "u-1".into(),
                kind: ActivityKind::Note,
                title: None,
                description: format!("note {i}"),
                entity_type: None,
                entity_id: None,
                created_at: Utc::now(),
            });
        }
        let summary = DashboardSummary::build(&snapshot);
        assert_eq!(summary.total_revenue, dec!(1000));
        assert_eq!(summary.recent_activities.len(), DashboardSummary::RECENT_LIMIT);
    }
}
