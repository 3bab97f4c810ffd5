use comfy_table::{Cell, Color};

use crate::derive::filter_clients;
use crate::models::{Client, ClientStatus};
use crate::notify::Notice;
use crate::services::ClientService;
use crate::view::{ClientForm, Form};

use super::{print_list, resolve_id, short_id, table, Context};

fn service<'a>(ctx: &Context<'a>) -> ClientService<'a> {
    ClientService::new(ctx.store, ctx.notifier)
}

/// Field overrides given on the command line; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ClientStatus>,
    pub notes: Option<String>,
}

impl ClientChanges {
    fn apply(self, form: &mut ClientForm) {
        if let Some(v) = self.name {
            form.name = v;
        }
        if let Some(v) = self.email {
            form.email = v;
        }
        if let Some(v) = self.company {
            form.company = v;
        }
        if let Some(v) = self.phone {
            form.phone = v;
        }
        if let Some(v) = self.status {
            form.status = v;
        }
        if let Some(v) = self.notes {
            form.notes = v;
        }
    }
}

fn find_client(ctx: &Context, clients: &[Client], id: &str) -> Option<Client> {
    let found = resolve_id(clients.iter().map(|c| c.id.as_str()), id)
        .and_then(|full| clients.iter().find(|c| c.id == full).cloned());
    if found.is_none() {
        ctx.notifier.notify(Notice::error(format!("Client '{id}' not found")));
    }
    found
}

pub fn cmd_clients(ctx: &Context, search: Option<&str>, status: Option<ClientStatus>) {
    let clients = service(ctx).list_clients();
    let shown: Vec<&Client> = filter_clients(&clients, search.unwrap_or(""), status);
    let hint = "Add one with `folio clients add <name> --email <email> --company <company>`.";
    print_list(shown, "clients", hint, |shown| {
        let mut t = table(&["ID", "Name", "Company", "Email", "Phone", "Status", "Projects", "Value"]);
        for c in shown {
            let color = match c.status {
                ClientStatus::Active => Color::Green,
                ClientStatus::Lead => Color::Yellow,
                ClientStatus::Inactive => Color::Grey,
            };
            t.add_row(vec![
                Cell::new(short_id(&c.id)),
                Cell::new(&c.name),
                Cell::new(&c.company),
                Cell::new(&c.email),
                Cell::new(c.phone.as_deref().unwrap_or("-")),
                Cell::new(c.status).fg(color),
                Cell::new(c.project_count),
                Cell::new(format!("${:.0}", c.total_value.unwrap_or(0.0))),
            ]);
        }
        t
    });
}

/// Creates a client from a filled-in form. Returns the new id.
pub fn cmd_client_add(ctx: &Context, form: ClientForm) -> Option<String> {
    let input = match form.validate() {
        Ok(i) => i,
        Err(e) => {
            ctx.invalid(e);
            return None;
        }
    };
    let id = ctx.settle(service(ctx).create_client(input), "Failed to save client")?;
    ctx.success(format!("Client added (id = {id})"));
    Some(id)
}

pub fn cmd_client_edit(ctx: &Context, id: &str, changes: ClientChanges) {
    let clients = service(ctx).list_clients();
    let Some(existing) = find_client(ctx, &clients, id) else { return };
    let mut form = ClientForm::from(&existing);
    changes.apply(&mut form);
    let input = match form.validate() {
        Ok(i) => i,
        Err(e) => return ctx.invalid(e),
    };
    if ctx.settle(service(ctx).update_client(&existing, input), "Failed to save client").is_some() {
        ctx.success(format!("Client {} updated", short_id(&existing.id)));
    }
}

/// Deletes the client only; projects that name it keep their client text.
pub fn cmd_client_remove(ctx: &Context, id: &str) {
    let clients = service(ctx).list_clients();
    let Some(client) = find_client(ctx, &clients, id) else { return };
    if ctx.settle(service(ctx).delete_client(&client.id), "Failed to delete client").is_some() {
        ctx.success(format!("Client '{}' deleted", client.name));
    }
}

pub fn cmd_clients_seed(ctx: &Context) {
    if let Some(count) = ctx.settle(service(ctx).seed_clients(), "Failed to add sample clients") {
        ctx.success(format!("Added {count} sample clients"));
    }
}
