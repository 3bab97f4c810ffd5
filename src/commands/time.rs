use chrono::{NaiveDate, Utc};
use comfy_table::{Cell, Color};

use crate::derive::strip_html;
use crate::derive::timesheet::{billable_total, day_total, entries_on, week_days, week_total};
use crate::notify::Notice;
use crate::services::{ProjectService, TimeEntryService};
use crate::view::{Form, TimeEntryForm};

use super::projects::find_project;
use super::{resolve_id, short_id, table, Context};

fn service<'a>(ctx: &Context<'a>) -> TimeEntryService<'a> {
    TimeEntryService::new(ctx.store, ctx.notifier)
}

/// What to log; `project` may be an id prefix.
#[derive(Debug, Clone)]
pub struct LogTime {
    pub project: String,
    pub hours: f64,
    pub description: Option<String>,
    pub date: Option<String>,
    pub billable: bool,
}

/// Weekly timesheet for the signed-in user.
pub fn cmd_time(ctx: &Context, week_of: Option<NaiveDate>) {
    let anchor = week_of.unwrap_or(ctx.today);
    let entries = service(ctx).list_time_entries(ctx.session.user_id());
    let days = week_days(anchor);

    let in_week: Vec<_> = days.iter().flat_map(|d| entries_on(&entries, *d)).collect();
    if in_week.is_empty() {
        println!("No time logged this week. Log some with `folio time log <project> --hours <h>`.");
    } else {
        let mut t = table(&["ID", "Date", "Project", "Description", "Hours", "Billable"]);
        for e in in_week {
            t.add_row(vec![
                Cell::new(short_id(&e.id)),
                Cell::new(e.date.format("%a %Y-%m-%d")),
                Cell::new(strip_html(&e.project_name)),
                Cell::new(&e.description),
                Cell::new(format!("{:.2}", e.hours)),
                if e.billable {
                    Cell::new("yes").fg(Color::Green)
                } else {
                    Cell::new("no").fg(Color::Grey)
                },
            ]);
        }
        println!("{t}");
    }

    let mut totals = table(&days.iter().map(|d| d.format("%a %d").to_string()).collect::<Vec<_>>());
    totals.add_row(days.iter().map(|d| {
        let hours = day_total(&entries, *d);
        Cell::new(format!("{hours:.2}")).fg(if *d == ctx.today { Color::Cyan } else { Color::Reset })
    }));
    println!("{totals}");
    println!(
        "Week total: {:.2}h, billable: {:.2}h",
        week_total(&entries, anchor),
        billable_total(&entries, anchor)
    );
}

/// Logs a manual entry. Returns the new entry id.
pub fn cmd_time_log(ctx: &Context, log: LogTime) -> Option<String> {
    let date = match log.date.as_deref() {
        Some(raw) => ctx.date_arg(raw)?,
        None => Utc::now(),
    };
    let form = TimeEntryForm {
        project_id: log.project.trim().to_string(),
        project_name: String::new(),
        description: log.description.unwrap_or_default(),
        date,
        hours: log.hours,
        billable: log.billable,
    };
    let mut entry = match form.validate() {
        Ok(e) => e,
        Err(e) => {
            ctx.invalid(e);
            return None;
        }
    };
    let projects = ProjectService::new(ctx.store, ctx.notifier).list_projects();
    let project = find_project(ctx, &projects, &entry.project_id)?;
    entry.project_id = project.id;
    entry.project_name = strip_html(&project.name);
    let saved = ctx.settle(service(ctx).add_time_entry(ctx.session.user_id(), entry), "Failed to save time entry")?;
    ctx.success(format!("Logged {:.2}h on {}", saved.hours, saved.project_name));
    Some(saved.id)
}

pub fn cmd_time_remove(ctx: &Context, id: &str) {
    let entries = service(ctx).list_time_entries(ctx.session.user_id());
    let Some(full) = resolve_id(entries.iter().map(|e| e.id.as_str()), id) else {
        ctx.notifier.notify(Notice::error(format!("Time entry '{id}' not found")));
        return;
    };
    if ctx.settle(service(ctx).delete_time_entry(&full), "Failed to delete time entry").is_some() {
        ctx.success("Time entry deleted");
    }
}
