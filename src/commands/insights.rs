use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Color};

use crate::derive::calendar::{calendar_days, events_on, project_events, CalendarView, EventKind};
use crate::derive::performance::performance_summary;
use crate::derive::reports::report;
use crate::derive::ChartPoint;
use crate::services::{ProjectService, TimeEntryService};

use super::{table, Context};

fn bar(value: i64, width: usize) -> String {
    let filled = (value.clamp(0, 100) as usize * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn chart(title: &str, points: &[ChartPoint]) {
    let mut t = table(&[title, "Count"]);
    for p in points {
        t.add_row(vec![Cell::new(&p.name), Cell::new(p.value)]);
    }
    println!("{t}");
}

pub fn cmd_performance(ctx: &Context) {
    let projects = ProjectService::new(ctx.store, ctx.notifier).list_projects();
    if projects.is_empty() {
        println!("No projects yet. Create one with `folio projects add <title>`.");
        return;
    }
    let s = performance_summary(&projects);

    let mut t = table(&[
        "Projects",
        "Completed",
        "Active",
        "Tasks",
        "Tasks done",
        "Avg progress",
        "Completion",
        "Task completion",
    ]);
    t.add_row(vec![
        Cell::new(s.total_projects),
        Cell::new(s.completed_projects),
        Cell::new(s.active_projects),
        Cell::new(s.total_tasks),
        Cell::new(s.completed_tasks),
        Cell::new(format!("{}%", s.avg_progress)),
        Cell::new(format!("{}%", s.completion_rate)),
        Cell::new(format!("{}%", s.task_completion_rate)),
    ]);
    println!("{t}");

    chart("Status", &s.status_data);
    chart("Priority", &s.priority_data);

    let mut progress = table(&["Project", "Progress", "", "Tasks"]);
    for row in &s.progress_data {
        progress.add_row(vec![
            Cell::new(&row.name),
            Cell::new(bar(i64::from(row.progress), 20)),
            Cell::new(format!("{}%", row.progress)),
            Cell::new(row.tasks),
        ]);
    }
    println!("{progress}");
}

pub fn cmd_reports(ctx: &Context) {
    let projects = ProjectService::new(ctx.store, ctx.notifier).list_projects();
    let entries = TimeEntryService::new(ctx.store, ctx.notifier).list_time_entries(ctx.session.user_id());
    let rate = ctx.config.hourly_rate;
    let r = report(&projects, &entries, ctx.today, rate);

    println!(
        "Revenue ${:.0} | {:.1}h logged | {:.1}h billable | {}% avg utilization (at ${rate:.0}/h)",
        r.summary.total_revenue, r.summary.total_hours, r.summary.billable_hours, r.summary.avg_utilization
    );

    let mut monthly = table(&["Month", "Billable", "Non-billable", "Total", "Revenue"]);
    for m in &r.monthly {
        monthly.add_row(vec![
            Cell::new(&m.month),
            Cell::new(format!("{:.1}", m.billable)),
            Cell::new(format!("{:.1}", m.non_billable)),
            Cell::new(format!("{:.1}", m.total)),
            Cell::new(format!("${:.0}", m.revenue)),
        ]);
    }
    println!("{monthly}");

    if r.profitability.is_empty() {
        println!("No projects to report on.");
    } else {
        let mut profit = table(&["Project", "Hours", "Revenue", "Cost", "Profit", "Margin"]);
        for p in &r.profitability {
            profit.add_row(vec![
                Cell::new(&p.name),
                Cell::new(format!("{:.1}", p.hours)),
                Cell::new(format!("${:.0}", p.revenue)),
                Cell::new(format!("${:.0}", p.cost)),
                Cell::new(format!("${:.0}", p.profit)).fg(if p.profit < 0.0 { Color::Red } else { Color::Reset }),
                Cell::new(format!("{}%", p.margin)),
            ]);
        }
        println!("{profit}");
    }

    if !r.utilization.is_empty() {
        let mut util = table(&["Member", "Billable", "Non-billable", "Available", "Utilization"]);
        for u in &r.utilization {
            util.add_row(vec![
                Cell::new(&u.user_id),
                Cell::new(format!("{:.1}", u.billable)),
                Cell::new(format!("{:.1}", u.non_billable)),
                Cell::new(format!("{:.1}", u.available)),
                Cell::new(format!("{} {}%", bar(u.utilization, 10), u.utilization)),
            ]);
        }
        println!("{util}");
    }
}

/// Month or week grid of project deadlines and open tasks.
pub fn cmd_calendar(ctx: &Context, anchor: Option<NaiveDate>, view: CalendarView) {
    let anchor = anchor.unwrap_or(ctx.today);
    let projects = ProjectService::new(ctx.store, ctx.notifier).list_projects();
    let events = project_events(&projects);
    let days = calendar_days(anchor, view);

    println!("{}", anchor.format(if view == CalendarView::Week { "Week of %Y-%m-%d" } else { "%B %Y" }));
    let mut grid = table(&["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]);
    for week in days.chunks(7) {
        grid.add_row(week.iter().map(|day| {
            let mut text = day.day().to_string();
            for e in events_on(&events, *day) {
                let marker = if e.kind == EventKind::Deadline { "!" } else { "·" };
                text.push_str(&format!("\n{marker} {}", e.title));
            }
            let color = if *day == ctx.today {
                Color::Cyan
            } else if day.month() != anchor.month() {
                Color::DarkGrey
            } else {
                Color::Reset
            };
            Cell::new(text).fg(color)
        }));
    }
    println!("{grid}");
}
