//! Terminal rendering.
//!
//! Tables, the kanban board, the analytics report, and one-line notices
//! (the toast analog). Rendering returns plain strings; only `notify`
//! writes directly, to stderr, so piped stdout stays clean data.

use crossterm::style::Stylize;
use rust_decimal::Decimal;

use crate::crm::Snapshot;
use crate::crm::types::{Activity, Client, Currency, Deal, Lead};
use crate::report::{DashboardSummary, Report};
use crate::view::BoardColumn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Print a one-line notice to stderr.
pub fn notify(color: bool, level: NoticeLevel, message: &str) {
    let tag = match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "error",
    };
    if color {
        let styled = match level {
            NoticeLevel::Info => tag.cyan(),
            NoticeLevel::Success => tag.green(),
            NoticeLevel::Warning => tag.yellow(),
            NoticeLevel::Error => tag.red(),
        };
        eprintln!("[{styled}] {message}");
    } else {
        eprintln!("[{tag}] {message}");
    }
}

/// First eight characters of a store id — enough to disambiguate in a
/// single-user dataset.
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let count = digits.chars().count();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (count - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// `12 500.50 ₽`-style money formatting.
pub fn fmt_money(value: Decimal, currency: Currency) -> String {
    let normalized = value.round_dp(2).normalize();
    let raw = normalized.abs().to_string();
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
    let mut formatted = group_thousands(int_part);
    if !frac_part.is_empty() {
        formatted.push('.');
        formatted.push_str(frac_part);
    }
    let sign = if value.is_sign_negative() && !normalized.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{formatted} {}", currency.symbol())
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    out.push_str(&render_row(&header_cells));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn render_leads(leads: &[&Lead]) -> String {
    if leads.is_empty() {
        return "No leads found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = leads
        .iter()
        .map(|lead| {
            vec![
                short_id(&lead.id),
                lead.name.clone(),
                lead.email.clone(),
                opt(&lead.company),
                lead.source.clone(),
                lead.status.label().to_string(),
                lead.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    render_table(
        &["ID", "NAME", "EMAIL", "COMPANY", "SOURCE", "STATUS", "CREATED"],
        &rows,
    )
}

pub fn render_clients(clients: &[&Client], currency: Currency) -> String {
    if clients.is_empty() {
        return "No clients found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = clients
        .iter()
        .map(|client| {
            vec![
                short_id(&client.id),
                client.name.clone(),
                client.email.clone(),
                client.status.label().to_string(),
                fmt_money(client.total_value, currency),
                client
                    .last_contact
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    render_table(
        &["ID", "NAME", "EMAIL", "STATUS", "TOTAL VALUE", "LAST CONTACT"],
        &rows,
    )
}

pub fn render_deals(deals: &[&Deal], currency: Currency) -> String {
    if deals.is_empty() {
        return "No deals found.\n".to_string();
    }
    let rows: Vec<Vec<String>> = deals
        .iter()
        .map(|deal| {
            vec![
                short_id(&deal.id),
                deal.title.clone(),
                fmt_money(deal.value, currency),
                deal.stage.label().to_string(),
                format!("{}%", deal.probability),
                deal.expected_close_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    render_table(
        &["ID", "TITLE", "VALUE", "STAGE", "PROB", "EXPECTED CLOSE"],
        &rows,
    )
}

pub fn render_board(columns: &[BoardColumn<'_>], currency: Currency) -> String {
    let mut out = String::new();
    for column in columns {
        out.push_str(&format!(
            "== {} ({}) — {}\n",
            column.stage.label(),
            column.deals.len(),
            fmt_money(column.total_value(), currency),
        ));
        for deal in &column.deals {
            out.push_str(&format!(
                "   [{}] {}  {}  {}%\n",
                short_id(&deal.id),
                deal.title,
                fmt_money(deal.value, currency),
                deal.probability,
            ));
        }
        out.push('\n');
    }
    out
}

pub fn render_activities(activities: &[Activity]) -> String {
    if activities.is_empty() {
        return "No activity yet.\n".to_string();
    }
    let rows: Vec<Vec<String>> = activities
        .iter()
        .map(|activity| {
            vec![
                activity.created_at.format("%Y-%m-%d %H:%M").to_string(),
                activity.kind.label(),
                activity.description.clone(),
            ]
        })
        .collect();
    render_table(&["WHEN", "KIND", "DESCRIPTION"], &rows)
}

pub fn render_dashboard(summary: &DashboardSummary, currency: Currency) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Leads: {}   Clients: {}   Deals: {}   Revenue: {}\n\n",
        summary.total_leads,
        summary.total_clients,
        summary.total_deals,
        fmt_money(summary.total_revenue, currency),
    ));
    out.push_str("Recent activity\n");
    if summary.recent_activities.is_empty() {
        out.push_str("  (none)\n");
    } else {
        for activity in &summary.recent_activities {
            out.push_str(&format!(
                "  {}  {}\n",
                activity.created_at.format("%Y-%m-%d %H:%M"),
                activity.description,
            ));
        }
    }
    out
}

pub fn render_report(report: &Report, currency: Currency) -> String {
    let mut out = String::new();
    out.push_str(&format!("Analytics — {}\n\n", report.window.label()));
    out.push_str(&format!(
        "Revenue:        {} (of {} total pipeline)\n",
        fmt_money(report.won_value, currency),
        fmt_money(report.total_value, currency),
    ));
    out.push_str(&format!(
        "Win rate:       {:.1}% ({} of {} closed deals)\n",
        report.win_rate,
        report.won_count,
        report.won_count + report.lost_count,
    ));
    out.push_str(&format!(
        "Average deal:   {} across {} deals\n",
        fmt_money(report.average_deal_value, currency),
        report.deals_in_window,
    ));
    out.push_str(&format!(
        "Conversion:     {:.1}% ({} clients from {} leads)\n\n",
        report.conversion_rate, report.clients_in_window, report.leads_in_window,
    ));
    out.push_str(&format!(
        "All time:       {} leads, {} clients, {} deals ({} open), {} activities\n\n",
        report.total_leads,
        report.total_clients,
        report.total_deals,
        report.open_deals,
        report.total_activities,
    ));

    out.push_str("Deals by stage\n");
    for entry in &report.by_stage {
        out.push_str(&format!(
            "  {:<14} {:>4}  {}\n",
            entry.stage.label(),
            entry.count,
            fmt_money(entry.value, currency),
        ));
    }

    out.push_str("\nLead sources\n");
    for (source, count) in &report.lead_sources {
        out.push_str(&format!("  {source:<20} {count}\n"));
    }

    out.push_str("\nLead statuses\n");
    for (status, count) in &report.lead_statuses {
        out.push_str(&format!("  {:<20} {count}\n", status.label()));
    }

    out.push_str("\nActivity by kind\n");
    for (kind, count) in &report.activity_kinds {
        out.push_str(&format!("  {:<20} {count}\n", kind.label()));
    }

    let active_days = report.series.iter().filter(|b| b.leads + b.clients + b.deals > 0);
    out.push_str("\nDaily activity (days with records)\n");
    let mut any = false;
    for bucket in active_days {
        any = true;
        out.push_str(&format!(
            "  {}  leads {:>3}  clients {:>3}  deals {:>3}  revenue {}\n",
            bucket.date,
            bucket.leads,
            bucket.clients,
            bucket.deals,
            fmt_money(bucket.won_value, currency),
        ));
    }
    if !any {
        out.push_str("  (none in window)\n");
    }
    out
}

/// Snapshot totals line used by `settings show` and `wipe` confirmations.
pub fn render_totals(snapshot: &Snapshot) -> String {
    format!(
        "{} leads, {} clients, {} deals, {} activities",
        snapshot.leads.len(),
        snapshot.clients.len(),
        snapshot.deals.len(),
        snapshot.activities.len(),
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn money_formatting_groups_thousands() {
        assert_eq!(fmt_money(dec!(1500000), Currency::Rub), "1 500 000 ₽");
        assert_eq!(fmt_money(dec!(999), Currency::Usd), "999 $");
        assert_eq!(fmt_money(dec!(1234.50), Currency::Eur), "1 234.5 €");
        assert_eq!(fmt_money(dec!(0), Currency::Rub), "0 ₽");
        assert_eq!(fmt_money(dec!(-1234), Currency::Usd), "-1 234 $");
    }

    #[test]
    fn short_id_truncates() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn empty_tables_say_so() {
        assert_eq!(render_leads(&[]), "No leads found.\n");
        assert_eq!(render_deals(&[], Currency::Rub), "No deals found.\n");
    }
}
