//! Billing reports computed from logged time. Every figure comes from real
//! entries; there is no projected or simulated data.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::{Project, TimeEntry};

use super::{rate, strip_html};

/// Months in the hours series, current month included.
pub const REPORT_MONTHS: u32 = 6;
/// Projects shown in the profitability table.
pub const PROFIT_ROWS: usize = 6;
/// Internal cost of one hour.
pub const COST_PER_HOUR: f64 = 75.0;
/// Working hours in a month (40h x 4 weeks).
pub const AVAILABLE_HOURS: f64 = 160.0;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MonthlyHours {
    pub month: String,
    pub billable: f64,
    pub non_billable: f64,
    pub total: f64,
    pub revenue: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectProfit {
    pub name: String,
    pub hours: f64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Utilization {
    pub user_id: String,
    pub billable: f64,
    pub non_billable: f64,
    /// Hours of the month not yet logged.
    pub available: f64,
    pub utilization: i64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    pub total_revenue: f64,
    pub total_hours: f64,
    pub billable_hours: f64,
    pub avg_utilization: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub monthly: Vec<MonthlyHours>,
    pub profitability: Vec<ProjectProfit>,
    pub utilization: Vec<Utilization>,
    pub summary: ReportSummary,
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn split_hours<'a>(entries: impl Iterator<Item = &'a TimeEntry>) -> (f64, f64) {
    entries.fold((0.0, 0.0), |(billable, other), e| {
        if e.billable { (billable + e.hours, other) } else { (billable, other + e.hours) }
    })
}

fn monthly_hours(entries: &[TimeEntry], today: NaiveDate, hourly_rate: f64) -> Vec<MonthlyHours> {
    let this_month = today.with_day(1).unwrap_or(today);
    (0..REPORT_MONTHS)
        .rev()
        .filter_map(|back| this_month.checked_sub_months(Months::new(back)))
        .map(|month| {
            let (billable, non_billable) =
                split_hours(entries.iter().filter(|e| same_month(e.date.date_naive(), month)));
            MonthlyHours {
                month: month.format("%b").to_string(),
                billable,
                non_billable,
                total: billable + non_billable,
                revenue: billable * hourly_rate,
            }
        })
        .collect()
}

fn profitability(projects: &[Project], entries: &[TimeEntry], hourly_rate: f64) -> Vec<ProjectProfit> {
    projects
        .iter()
        .take(PROFIT_ROWS)
        .map(|p| {
            let hours: f64 = entries.iter().filter(|e| e.project_id == p.id).map(|e| e.hours).sum();
            let revenue = hours * hourly_rate;
            let cost = hours * COST_PER_HOUR;
            let profit = revenue - cost;
            ProjectProfit {
                name: strip_html(&p.name).chars().take(15).collect(),
                hours,
                revenue,
                cost,
                profit,
                margin: rate(profit, revenue),
            }
        })
        .collect()
}

/// Per-user load for the month containing `today`, users in first-seen order.
fn utilization(entries: &[TimeEntry], today: NaiveDate) -> Vec<Utilization> {
    let in_month: Vec<&TimeEntry> = entries.iter().filter(|e| same_month(e.date.date_naive(), today)).collect();
    let mut users: Vec<&str> = Vec::new();
    for e in &in_month {
        if !users.contains(&e.user_id.as_str()) {
            users.push(&e.user_id);
        }
    }
    users
        .into_iter()
        .map(|user| {
            let (billable, non_billable) = split_hours(in_month.iter().copied().filter(|e| e.user_id == user));
            Utilization {
                user_id: user.to_string(),
                billable,
                non_billable,
                available: (AVAILABLE_HOURS - billable - non_billable).max(0.0),
                utilization: rate(billable, AVAILABLE_HOURS),
            }
        })
        .collect()
}

/// Builds every report table for the period ending at `today`.
pub fn report(projects: &[Project], entries: &[TimeEntry], today: NaiveDate, hourly_rate: f64) -> Report {
    let monthly = monthly_hours(entries, today, hourly_rate);
    let utilization = utilization(entries, today);
    let avg_utilization = if utilization.is_empty() {
        0
    } else {
        let sum: i64 = utilization.iter().map(|u| u.utilization).sum();
        (sum as f64 / utilization.len() as f64).round() as i64
    };
    let summary = ReportSummary {
        total_revenue: monthly.iter().map(|m| m.revenue).sum(),
        total_hours: monthly.iter().map(|m| m.total).sum(),
        billable_hours: monthly.iter().map(|m| m.billable).sum(),
        avg_utilization,
    };
    Report {
        profitability: profitability(projects, entries, hourly_rate),
        monthly,
        utilization,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectStatus};
    use chrono::{TimeZone, Utc};

    fn entry(user: &str, project: &str, y: i32, m: u32, d: u32, hours: f64, billable: bool) -> TimeEntry {
        let date = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
        TimeEntry {
            id: format!("{user}-{project}-{m}-{d}"),
            user_id: user.into(),
            project_id: project.into(),
            project_name: project.into(),
            description: String::new(),
            date,
            hours,
            billable,
            created_at: date,
        }
    }

    fn project(id: &str, name: &str) -> Project {
        let now = Utc::now();
        Project {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            client: String::new(),
            status: ProjectStatus::Active,
            priority: Priority::Medium,
            start_date: now,
            end_date: now,
            progress: 0,
            task_count: 0,
            tasks: vec![],
            members: vec![],
            tags: vec![],
            type_label: String::new(),
        }
    }

    #[test]
    fn monthly_series_spans_six_months_ending_now() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let entries = vec![
            entry("a", "p", 2025, 3, 1, 4.0, true),
            entry("a", "p", 2025, 3, 2, 1.0, false),
            entry("a", "p", 2024, 10, 5, 2.0, true),
            entry("a", "p", 2024, 9, 30, 9.0, true),
        ];
        let r = report(&[], &entries, today, 100.0);
        let months: Vec<&str> = r.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
        assert_eq!(r.monthly[0].billable, 2.0);
        assert_eq!(r.monthly[5].total, 5.0);
        assert_eq!(r.monthly[5].revenue, 400.0);
        assert_eq!(r.summary.total_hours, 7.0);
        assert_eq!(r.summary.billable_hours, 6.0);
        assert_eq!(r.summary.total_revenue, 600.0);
    }

    #[test]
    fn profitability_from_logged_hours() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let projects = vec![project("p1", "<b>Website redesign project</b>"), project("p2", "Idle")];
        let entries = vec![entry("a", "p1", 2025, 3, 1, 10.0, true), entry("b", "p1", 2025, 2, 1, 10.0, false)];
        let r = report(&projects, &entries, today, 150.0);
        let p1 = &r.profitability[0];
        assert_eq!(p1.name, "Website redesig");
        assert_eq!(p1.hours, 20.0);
        assert_eq!(p1.revenue, 3000.0);
        assert_eq!(p1.cost, 1500.0);
        assert_eq!(p1.margin, 50);
        // No hours, no revenue: margin is 0 instead of a division fault.
        assert_eq!(r.profitability[1].margin, 0);
    }

    #[test]
    fn utilization_per_user_this_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let entries = vec![
            entry("b", "p", 2025, 3, 3, 80.0, true),
            entry("a", "p", 2025, 3, 4, 40.0, true),
            entry("a", "p", 2025, 3, 5, 8.0, false),
            entry("a", "p", 2025, 2, 5, 100.0, true),
        ];
        let r = report(&[], &entries, today, 150.0);
        assert_eq!(r.utilization.len(), 2);
        assert_eq!(r.utilization[0].user_id, "b");
        assert_eq!(r.utilization[0].utilization, 50);
        assert_eq!(r.utilization[1].utilization, 25);
        assert_eq!(r.utilization[1].available, 112.0);
        assert_eq!(r.summary.avg_utilization, 38);
    }

    #[test]
    fn no_entries_no_numbers() {
        let r = report(&[], &[], NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(), 150.0);
        assert_eq!(r.monthly.len(), 6);
        assert!(r.utilization.is_empty());
        assert_eq!(r.summary, ReportSummary::default());
    }
}
