//! Calendar-day bucketing for the analytics time series.

use chrono::{Days, NaiveDate, TimeZone};
use rust_decimal::Decimal;

use crate::crm::types::{Client, Deal, DealStage, Lead};

/// Trailing windows the analytics screen offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Days7,
    Days30,
    Days90,
    Days365,
}

impl TimeWindow {
    pub const ALL: [Self; 4] = [Self::Days7, Self::Days30, Self::Days90, Self::Days365];

    pub fn days(self) -> u32 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
            Self::Days365 => 365,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.days() == days)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Days7 => "last 7 days",
            Self::Days30 => "last 30 days",
            Self::Days90 => "last 90 days",
            Self::Days365 => "last 365 days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub leads: usize,
    pub clients: usize,
    pub deals: usize,
    /// Value of deals created that day that are currently closed-won.
    pub won_value: Decimal,
}

impl DayBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            leads: 0,
            clients: 0,
            deals: 0,
            won_value: Decimal::ZERO,
        }
    }
}

/// Bucket records by the calendar day they were created, in `tz`-local time,
/// walking every day of the trailing window.
///
/// The result always has exactly `window.days()` entries, oldest to newest,
/// zero-filled for days without records. Records outside the window are
/// ignored.
pub fn daily_series<Tz: TimeZone>(
    tz: &Tz,
    today: NaiveDate,
    window: TimeWindow,
    leads: &[Lead],
    clients: &[Client],
    deals: &[Deal],
) -> Vec<DayBucket> {
    let days = window.days();
    let mut buckets: Vec<DayBucket> = (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back.into())))
        .map(DayBucket::empty)
        .collect();
    let first = match buckets.first() {
        Some(bucket) => bucket.date,
        None => return buckets,
    };
    let len = buckets.len();

    let index_of = move |date: NaiveDate| -> Option<usize> {
        let offset = date.signed_duration_since(first).num_days();
        usize::try_from(offset).ok().filter(|i| *i < len)
    };

    for lead in leads {
        if let Some(i) = index_of(lead.created_at.with_timezone(tz).date_naive()) {
            buckets[i].leads += 1;
        }
    }
    for client in clients {
        if let Some(i) = index_of(client.created_at.with_timezone(tz).date_naive()) {
            buckets[i].clients += 1;
        }
    }
    for deal in deals {
        if let Some(i) = index_of(deal.created_at.with_timezone(tz).date_naive()) {
            buckets[i].deals += 1;
            if deal.stage == DealStage::ClosedWon {
                buckets[i].won_value += deal.value;
            }
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::crm::types::LeadStatus;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn lead_on(day: NaiveDate) -> Lead {
        let at = Utc
            .from_utc_datetime(&day.and_hms_opt(10, 0, 0).expect("time"));
        Lead {
            id: format!("l-{day}"),
            owner_id: "u-1".into(),
            name: "L".into(),
            email: "l@example.com".into(),
            phone: None,
            company: None,
            position: None,
            source: "website".into(),
            status: LeadStatus::New,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn deal_on(day: NaiveDate, stage: DealStage, value: Decimal) -> Deal {
        let at = Utc
            .from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("time"));
        Deal {
            id: format!("d-{day}"),
            owner_id: "u-1".into(),
            title: "D".into(),
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

    #[test]
    fn series_has_exactly_n_days_oldest_first_zero_filled() {
        let today = date(2026, 8, 7);
        let series = daily_series(&Utc, today, TimeWindow::Days7, &[], &[], &[]);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, date(2026, 8, 1));
        assert_eq!(series[6].date, today);
        assert!(series.iter().all(|b| b.leads == 0 && b.won_value == Decimal::ZERO));
    }

    #[test]
    fn records_land_in_their_creation_day() {
        let today = date(2026, 8, 7);
        let leads = vec![lead_on(date(2026, 8, 5)), lead_on(date(2026, 8, 5))];
        let deals = vec![
            deal_on(date(2026, 8, 7), DealStage::ClosedWon, dec!(1000)),
            deal_on(date(2026, 8, 7), DealStage::New, dec!(500)),
        ];

        let series = daily_series(&Utc, today, TimeWindow::Days7, &leads, &[], &deals);
        let fifth = series.iter().find(|b| b.date == date(2026, 8, 5)).expect("bucket");
        assert_eq!(fifth.leads, 2);

        let last = series.last().expect("today");
        assert_eq!(last.deals, 2);
        assert_eq!(last.won_value, dec!(1000));
    }

    #[test]
    fn records_outside_the_window_are_ignored() {
        let today = date(2026, 8, 7);
        let leads = vec![lead_on(date(2026, 7, 1)), lead_on(date(2026, 8, 9))];
        let series = daily_series(&Utc, today, TimeWindow::Days7, &leads, &[], &[]);
        assert!(series.iter().all(|b| b.leads == 0));
    }
}
