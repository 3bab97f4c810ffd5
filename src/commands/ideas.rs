use comfy_table::Cell;

use crate::derive::truncate;
use crate::models::Idea;
use crate::notify::Notice;
use crate::services::IdeaService;
use crate::view::{Form, IdeaForm};

use super::{print_list, resolve_id, short_id, table, Context};

fn service<'a>(ctx: &Context<'a>) -> IdeaService<'a> {
    IdeaService::new(ctx.store, ctx.notifier)
}

fn find_idea(ctx: &Context, ideas: &[Idea], id: &str) -> Option<Idea> {
    let found = resolve_id(ideas.iter().map(|i| i.id.as_str()), id)
        .and_then(|full| ideas.iter().find(|i| i.id == full).cloned());
    if found.is_none() {
        ctx.notifier.notify(Notice::error(format!("Idea '{id}' not found")));
    }
    found
}

pub fn cmd_ideas(ctx: &Context) {
    let ideas = service(ctx).list_ideas();
    print_list(ideas, "ideas", "Capture one with `folio ideas add <title>`.", |ideas| {
        let mut t = table(&["ID", "Title", "Description", "Created", "Updated"]);
        for idea in ideas {
            t.add_row(vec![
                Cell::new(short_id(&idea.id)),
                Cell::new(&idea.title),
                Cell::new(truncate(&idea.description, 60)),
                Cell::new(idea.created_at.format("%Y-%m-%d")),
                Cell::new(idea.updated_at.map(|u| u.format("%Y-%m-%d").to_string()).unwrap_or_default()),
            ]);
        }
        t
    });
}

pub fn cmd_idea_add(ctx: &Context, form: IdeaForm) -> Option<String> {
    let input = match form.validate() {
        Ok(i) => i,
        Err(e) => {
            ctx.invalid(e);
            return None;
        }
    };
    let id = ctx.settle(service(ctx).create_idea(input), "Failed to save idea")?;
    ctx.success("Idea saved");
    Some(id)
}

pub fn cmd_idea_edit(ctx: &Context, id: &str, title: Option<String>, description: Option<String>) {
    let ideas = service(ctx).list_ideas();
    let Some(idea) = find_idea(ctx, &ideas, id) else { return };
    let form = IdeaForm {
        title: title.unwrap_or(idea.title),
        description: description.unwrap_or(idea.description),
    };
    let input = match form.validate() {
        Ok(i) => i,
        Err(e) => return ctx.invalid(e),
    };
    if ctx.settle(service(ctx).update_idea(&idea.id, input), "Failed to save idea").is_some() {
        ctx.success("Idea updated");
    }
}

pub fn cmd_idea_remove(ctx: &Context, id: &str) {
    let ideas = service(ctx).list_ideas();
    let Some(idea) = find_idea(ctx, &ideas, id) else { return };
    if ctx.settle(service(ctx).delete_idea(&idea.id), "Failed to delete idea").is_some() {
        ctx.success(format!("Idea '{}' deleted", idea.title));
    }
}
