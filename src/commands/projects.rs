use chrono::NaiveDate;
use comfy_table::{Cell, Color, Table};

use crate::derive::strip_html;
use crate::models::{Project, ProjectStatus};
use crate::services::{ProjectDraft, ProjectService};
use crate::view::{Form, ProjectEditForm};

use super::{print_list, priority_color, resolve_id, short_id, table, Context};

fn service<'a>(ctx: &Context<'a>) -> ProjectService<'a> {
    ProjectService::new(ctx.store, ctx.notifier)
}

/// Resolves a project by full id or id prefix, raising a notice when nothing
/// matches.
pub(crate) fn find_project(ctx: &Context, projects: &[Project], id: &str) -> Option<Project> {
    let found = resolve_id(projects.iter().map(|p| p.id.as_str()), id)
        .and_then(|full| projects.iter().find(|p| p.id == full).cloned());
    if found.is_none() {
        ctx.notifier.notify(crate::notify::Notice::error(format!("Project '{id}' not found")));
    }
    found
}

pub fn cmd_projects(ctx: &Context) {
    let projects = service(ctx).list_projects();
    print_list(projects, "projects", "Create one with `folio projects add <title>`.", |projects| {
        project_table(&projects, ctx.today)
    });
}

/// One row per project; progress and task count are shown as stored.
pub fn project_table(projects: &[Project], today: NaiveDate) -> Table {
    let mut t = table(&["ID", "Name", "Client", "Status", "Priority", "Due", "Progress", "Tasks"]);
    for p in projects {
        let status_color = match p.status {
            ProjectStatus::Completed => Color::Green,
            ProjectStatus::Active => Color::Yellow,
            ProjectStatus::Cancelled => Color::Grey,
            ProjectStatus::Backlog | ProjectStatus::Planned => Color::Reset,
        };
        let overdue = p.end_date.date_naive() < today && p.status != ProjectStatus::Completed;
        t.add_row(vec![
            Cell::new(short_id(&p.id)),
            Cell::new(strip_html(&p.name)),
            Cell::new(&p.client),
            Cell::new(p.status).fg(status_color),
            Cell::new(p.priority).fg(priority_color(p.priority)),
            Cell::new(p.end_date.format("%Y-%m-%d")).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(format!("{}%", p.progress)),
            Cell::new(p.task_count),
        ]);
    }
    t
}

/// Creates a project from wizard input. Returns the new id.
pub fn cmd_project_add(ctx: &Context, mut draft: ProjectDraft) -> Option<String> {
    if draft.owner_name.is_none() {
        draft.owner_name = Some(ctx.session.display_name().to_string());
    }
    let project = ctx.settle(service(ctx).create_project(draft), "Failed to create project")?;
    ctx.success(format!("Project created (id = {})", project.id));
    Some(project.id)
}

pub fn cmd_project_edit(ctx: &Context, id: &str, form: ProjectEditForm) {
    let update = match form.validate() {
        Ok(u) => u,
        Err(e) => return ctx.invalid(e),
    };
    let projects = service(ctx).list_projects();
    let Some(project) = find_project(ctx, &projects, id) else { return };
    if ctx.settle(service(ctx).update_project(&project.id, update), "Failed to update project").is_some() {
        ctx.success(format!("Project {} updated", short_id(&project.id)));
    }
}

pub fn cmd_project_remove(ctx: &Context, id: &str) {
    let projects = service(ctx).list_projects();
    let Some(project) = find_project(ctx, &projects, id) else { return };
    if ctx.settle(service(ctx).delete_project(&project.id), "Failed to delete project").is_some() {
        ctx.success(format!("Project '{}' deleted", strip_html(&project.name)));
    }
}

pub fn cmd_projects_seed(ctx: &Context) {
    if let Some(count) = ctx.settle(service(ctx).seed_projects(), "Failed to add sample projects") {
        ctx.success(format!("Added {count} sample projects"));
    }
}
