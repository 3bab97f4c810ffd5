use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{Project, TaskStatus};

use super::strip_html;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Deadline,
    Task,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub kind: EventKind,
    pub project_name: String,
    /// Index of the source project, used to pick a stable colour.
    pub project_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarView {
    #[default]
    Month,
    Week,
}

/// One deadline per project plus one event per open task.
pub fn project_events(projects: &[Project]) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    for (idx, project) in projects.iter().enumerate() {
        let project_name = strip_html(&project.name);
        events.push(CalendarEvent {
            id: format!("{}-deadline", project.id),
            title: format!("{project_name} deadline"),
            date: project.end_date,
            kind: EventKind::Deadline,
            project_name: project_name.clone(),
            project_index: idx,
        });
        for task in project.tasks.iter().filter(|t| t.status != TaskStatus::Done) {
            events.push(CalendarEvent {
                id: format!("{}-{}", project.id, task.id),
                title: strip_html(&task.name),
                date: task.end_date,
                kind: EventKind::Task,
                project_name: project_name.clone(),
                project_index: idx,
            });
        }
    }
    events
}

pub fn events_on(events: &[CalendarEvent], day: NaiveDate) -> Vec<&CalendarEvent> {
    events.iter().filter(|e| e.date.date_naive() == day).collect()
}

/// Sunday on or before `day`.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_sunday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

/// Days covered by the grid: whole Sunday-start weeks around the month, or
/// the single week containing `anchor`.
pub fn calendar_days(anchor: NaiveDate, view: CalendarView) -> Vec<NaiveDate> {
    let (first, last) = match view {
        CalendarView::Week => {
            let start = start_of_week(anchor);
            (start, start + Days::new(6))
        }
        CalendarView::Month => {
            let month_start = anchor.with_day(1).unwrap_or(anchor);
            let month_end = month_start
                .checked_add_months(Months::new(1))
                .and_then(|d| d.pred_opt())
                .unwrap_or(month_start);
            let grid_start = start_of_week(month_start);
            let grid_end = start_of_week(month_end) + Days::new(6);
            (grid_start, grid_end)
        }
    };
    first.iter_days().take_while(|d| *d <= last).collect()
}
