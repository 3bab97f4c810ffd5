use comfy_table::{Cell, Color};

use crate::derive::tasks::{bucket_tasks, flatten_tasks, group_by_status, task_stats, ProjectTask};
use crate::derive::strip_html;
use crate::models::TaskStatus;
use crate::notify::Notice;
use crate::services::{ProjectService, TaskUpdate};
use crate::view::{Form, TaskForm};

use super::projects::find_project;
use super::{print_list, priority_color, resolve_id, short_id, status_color, table, Context};

fn service<'a>(ctx: &Context<'a>) -> ProjectService<'a> {
    ProjectService::new(ctx.store, ctx.notifier)
}

fn task_rows(ctx: &Context, tasks: Vec<ProjectTask>) -> comfy_table::Table {
    let mut t = table(&["ID", "Task", "Project", "Assignee", "Status", "Priority", "Due"]);
    for pt in tasks {
        let due = pt.due_day();
        let late = due < ctx.today && pt.task.status != TaskStatus::Done;
        t.add_row(vec![
            Cell::new(short_id(&pt.task.id)),
            Cell::new(&pt.task.name),
            Cell::new(strip_html(&pt.project_name)),
            Cell::new(&pt.task.assignee),
            Cell::new(pt.task.status.label()).fg(status_color(pt.task.status)),
            Cell::new(pt.priority()).fg(priority_color(pt.priority())),
            Cell::new(due).fg(if late { Color::Red } else { Color::Reset }),
        ]);
    }
    t
}

/// Looks a task up by id or id prefix across every project.
fn find_task(ctx: &Context, id: &str) -> Option<ProjectTask> {
    let tasks = flatten_tasks(&service(ctx).list_projects());
    let found = resolve_id(tasks.iter().map(|t| t.task.id.as_str()), id)
        .and_then(|full| tasks.into_iter().find(|t| t.task.id == full));
    if found.is_none() {
        ctx.notifier.notify(Notice::error(format!("Task '{id}' not found")));
    }
    found
}

pub fn cmd_tasks(ctx: &Context) {
    let tasks = flatten_tasks(&service(ctx).list_projects());
    let stats = task_stats(&tasks);
    print_list(tasks, "tasks", "Add one with `folio tasks add <project> <name> --due YYYY-MM-DD`.", |tasks| {
        task_rows(ctx, tasks)
    });
    if stats.total > 0 {
        println!(
            "{} total, {} to do, {} in progress, {} done",
            stats.total, stats.todo, stats.in_progress, stats.done
        );
    }
}

/// Tasks grouped into overdue, today, upcoming and completed.
pub fn cmd_my_tasks(ctx: &Context) {
    let tasks = flatten_tasks(&service(ctx).list_projects());
    if tasks.is_empty() {
        println!("No tasks yet. Add one with `folio tasks add <project> <name> --due YYYY-MM-DD`.");
        return;
    }
    let buckets = bucket_tasks(&tasks, ctx.today);
    for (title, group) in [
        ("Overdue", buckets.overdue),
        ("Due today", buckets.today),
        ("Upcoming (next 7 days)", buckets.upcoming),
        ("Completed", buckets.completed),
    ] {
        println!("{title} ({})", group.len());
        if !group.is_empty() {
            println!("{}", task_rows(ctx, group));
        }
    }
}

pub fn cmd_board(ctx: &Context) {
    let tasks = flatten_tasks(&service(ctx).list_projects());
    if tasks.is_empty() {
        println!("No tasks yet. Add one with `folio tasks add <project> <name> --due YYYY-MM-DD`.");
        return;
    }
    let columns = group_by_status(&tasks);
    let headers: Vec<String> = columns.iter().map(|(s, c)| format!("{} ({})", s.label(), c.len())).collect();
    let mut t = table(&headers);
    let depth = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
    for row in 0..depth {
        t.add_row(columns.iter().map(|(_, c)| match c.get(row) {
            Some(pt) => Cell::new(format!("{}\n{} · {}", pt.task.name, strip_html(&pt.project_name), pt.task.assignee))
                .fg(priority_color(pt.priority())),
            None => Cell::new(""),
        }));
    }
    println!("{t}");
}

pub fn cmd_task_add(ctx: &Context, form: TaskForm) -> Option<String> {
    let (prefix, task) = match form.validate() {
        Ok(v) => v,
        Err(e) => {
            ctx.invalid(e);
            return None;
        }
    };
    let projects = service(ctx).list_projects();
    let project_id = find_project(ctx, &projects, &prefix)?.id;
    let task = ctx.settle(service(ctx).add_task(&project_id, task), "Failed to add task")?;
    ctx.success(format!("Task added (id = {})", task.id));
    Some(task.id)
}

/// Moves a task to another board column.
pub fn cmd_task_move(ctx: &Context, id: &str, status: TaskStatus) {
    let Some(pt) = find_task(ctx, id) else { return };
    let result = service(ctx).set_task_status(&pt.project_id, &pt.task.id, status);
    if let Some(task) = ctx.settle(result, "Failed to update task status") {
        ctx.success(format!("'{}' moved to {}", task.name, status.label()));
    }
}

pub fn cmd_task_edit(ctx: &Context, id: &str, update: TaskUpdate) {
    let Some(pt) = find_task(ctx, id) else { return };
    if ctx.settle(service(ctx).update_task(&pt.project_id, &pt.task.id, update), "Failed to update task").is_some() {
        ctx.success(format!("Task {} updated", short_id(&pt.task.id)));
    }
}

pub fn cmd_task_remove(ctx: &Context, id: &str) {
    let Some(pt) = find_task(ctx, id) else { return };
    if ctx.settle(service(ctx).delete_task(&pt.project_id, &pt.task.id), "Failed to delete task").is_some() {
        ctx.success(format!("Task '{}' deleted", pt.task.name));
    }
}
