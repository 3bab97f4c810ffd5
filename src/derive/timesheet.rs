use chrono::{Days, NaiveDate};

use crate::models::TimeEntry;

use super::calendar::start_of_week;

/// The seven days (Sunday first) of the week containing `anchor`.
pub fn week_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    start_of_week(anchor).iter_days().take(7).collect()
}

pub fn entries_on(entries: &[TimeEntry], day: NaiveDate) -> Vec<&TimeEntry> {
    entries.iter().filter(|e| e.date.date_naive() == day).collect()
}

pub fn day_total(entries: &[TimeEntry], day: NaiveDate) -> f64 {
    entries_on(entries, day).iter().map(|e| e.hours).sum()
}

pub fn week_total(entries: &[TimeEntry], anchor: NaiveDate) -> f64 {
    week_days(anchor).into_iter().map(|d| day_total(entries, d)).sum()
}

/// Billable hours logged within the week containing `anchor`.
pub fn billable_total(entries: &[TimeEntry], anchor: NaiveDate) -> f64 {
    let start = start_of_week(anchor);
    let end = start + Days::new(6);
    entries
        .iter()
        .filter(|e| e.billable)
        .filter(|e| {
            let day = e.date.date_naive();
            day >= start && day <= end
        })
        .map(|e| e.hours)
        .sum()
}
