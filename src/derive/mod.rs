//! Pure view derivations over already-fetched entities. Nothing here does I/O
//! or reads the clock; "today" and anchors are always passed in.

pub mod calendar;
pub mod performance;
pub mod reports;
pub mod tasks;
pub mod timesheet;

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::models::{Client, ClientStatus};

pub use calendar::{calendar_days, events_on, project_events, CalendarEvent, CalendarView, EventKind};
pub use performance::{performance_summary, PerformanceSummary, ProgressRow};
pub use reports::{report, MonthlyHours, ProjectProfit, Report, ReportSummary, Utilization};
pub use tasks::{bucket_tasks, flatten_tasks, group_by_status, task_stats, ProjectTask, TaskBuckets, TaskStats};
pub use timesheet::{billable_total, day_total, entries_on, week_days, week_total};

/// A `{name, value}` pair as consumed by charts.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChartPoint {
    pub name: String,
    pub value: usize,
}

/// `round(100 * numerator / denominator)`, or 0 for an empty denominator.
pub fn rate(numerator: f64, denominator: f64) -> i64 {
    if denominator == 0.0 {
        return 0;
    }
    (100.0 * numerator / denominator).round() as i64
}

/// Tallies items by a discriminant. The map has no meaningful order.
pub fn count_by<T, K, F>(items: &[T], key: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(key(item)).or_insert(0) += 1;
    }
    counts
}

/// Chart points with capitalized labels, ordered by `order`. Labels missing
/// from `order` are dropped.
pub fn chart_points<K: Eq + Hash + ToString>(counts: &HashMap<K, usize>, order: &[K]) -> Vec<ChartPoint> {
    order
        .iter()
        .filter_map(|k| counts.get(k).map(|&value| ChartPoint { name: capitalize(&k.to_string()), value }))
        .collect()
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Drops `<...>` markup from rich-text names.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Cuts to `max` characters and appends `...` when something was cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Case-insensitive search over name, company and email plus a status filter.
pub fn filter_clients<'a>(clients: &'a [Client], query: &str, status: Option<ClientStatus>) -> Vec<&'a Client> {
    let q = query.trim().to_lowercase();
    clients
        .iter()
        .filter(|c| {
            q.is_empty()
                || c.name.to_lowercase().contains(&q)
                || c.company.to_lowercase().contains(&q)
                || c.email.to_lowercase().contains(&q)
        })
        .filter(|c| status.map_or(true, |s| c.status == s))
        .collect()
}
