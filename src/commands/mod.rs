//! Handlers behind the CLI subcommands.
//!
//! Every handler takes a [`Context`] and prints to stdout. Problems are never
//! returned to the caller: they are logged and surfaced as notices, the same
//! way the interactive dashboard reports them.

mod clients;
mod ideas;
mod insights;
mod projects;
mod tasks;
mod time;

pub use clients::*;
pub use ideas::*;
pub use insights::*;
pub use projects::*;
pub use tasks::*;
pub use time::*;

use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::config::Config;
use crate::models::{Priority, TaskStatus};
use crate::notify::{Notice, Notifier};
use crate::services::ServiceError;
use crate::session::Session;
use crate::store::DocumentStore;
use crate::timestamp::parse_day;
use crate::view::{ValidationError, ViewState};

/// Everything a handler needs: where data lives, who is asking, and where
/// notices go.
pub struct Context<'a> {
    pub store: &'a dyn DocumentStore,
    pub notifier: &'a dyn Notifier,
    pub session: &'a Session,
    pub config: &'a Config,
    pub today: NaiveDate,
}

impl<'a> Context<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        notifier: &'a dyn Notifier,
        session: &'a Session,
        config: &'a Config,
    ) -> Self {
        Context { store, notifier, session, config, today: Utc::now().date_naive() }
    }

    pub(crate) fn success(&self, message: impl Into<String>) {
        self.notifier.notify(Notice::success(message));
    }

    /// Logs a failed write and raises `failure` as the notice.
    pub(crate) fn settle<T>(&self, result: Result<T, ServiceError>, failure: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(error = %e, "{failure}");
                self.notifier.notify(Notice::error(failure));
                None
            }
        }
    }

    pub(crate) fn invalid(&self, err: ValidationError) {
        self.notifier.notify(Notice::error(err.to_string()));
    }

    /// Parses a `YYYY-MM-DD` argument, raising a notice when it is malformed.
    pub(crate) fn date_arg(&self, raw: &str) -> Option<DateTime<Utc>> {
        match parse_day(raw) {
            Ok(d) => Some(d),
            Err(_) => {
                self.invalid(ValidationError::InvalidDate(raw.to_string()));
                None
            }
        }
    }
}

pub(crate) fn table<S: AsRef<str>>(headers: &[S]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h.as_ref()).add_attribute(Attribute::Bold)));
    table
}

/// Prints either the table built from `items` or the empty-state hint.
pub(crate) fn print_list<T>(
    items: Vec<T>,
    what: &str,
    create_label: &'static str,
    render: impl FnOnce(Vec<T>) -> Table,
) {
    match ViewState::resolve(false, items, create_label) {
        ViewState::Ready(items) => println!("{}", render(items)),
        ViewState::Empty { create_label } => println!("No {what} yet. {create_label}"),
        ViewState::Loading => {}
    }
}

pub(crate) fn priority_color(p: Priority) -> Color {
    match p {
        Priority::Urgent => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::Cyan,
        Priority::Low => Color::Grey,
    }
}

pub(crate) fn status_color(s: TaskStatus) -> Color {
    match s {
        TaskStatus::Done => Color::Green,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Todo => Color::Reset,
    }
}

/// Short form of a generated id for table display.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Finds a full id from an unambiguous prefix (as shown by [`short_id`]).
pub(crate) fn resolve_id<'i>(ids: impl IntoIterator<Item = &'i str>, prefix: &str) -> Option<String> {
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(prefix)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == prefix) {
        return Some(exact.to_string());
    }
    match matches.as_slice() {
        [only] => Some(only.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_prefix_must_be_unambiguous() {
        let ids = ["abc123", "abd999", "zz"];
        assert_eq!(resolve_id(ids, "abc"), Some("abc123".to_string()));
        assert_eq!(resolve_id(ids, "ab"), None);
        assert_eq!(resolve_id(ids, "q"), None);
        assert_eq!(short_id("0123456789"), "01234567");
    }
}
