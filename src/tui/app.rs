use chrono::{DateTime, Days, NaiveDate, Utc};
use ratatui::widgets::TableState;

use crate::collection::{Action, Collection};
use crate::config::Config;
use crate::derive::calendar::start_of_week;
use crate::derive::performance::{performance_summary, PerformanceSummary};
use crate::derive::strip_html;
use crate::derive::tasks::{bucket_tasks, flatten_tasks, group_by_status, ProjectTask};
use crate::models::{Client, ClientStatus, Idea, Keyed, Project, TaskStatus, TimeEntry};
use crate::notify::{Notice, NoticeBuffer, Notifier};
use crate::services::{ClientService, IdeaService, ProjectService, ServiceError, TimeEntryService};
use crate::services::projects::ProjectWatch;
use crate::session::Session;
use crate::store::DocumentStore;
use crate::timer::Timer;
use crate::view::{ClientForm, CrudDialog, DialogMode, DialogOutcome, Form, IdeaForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    MyTasks,
    Board,
    Clients,
    Ideas,
    Time,
    Performance,
}

impl Tab {
    pub const ALL: [Tab; 6] = [Tab::MyTasks, Tab::Board, Tab::Clients, Tab::Ideas, Tab::Time, Tab::Performance];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::MyTasks => "My Tasks",
            Tab::Board => "Board",
            Tab::Clients => "Clients",
            Tab::Ideas => "Ideas",
            Tab::Time => "Time",
            Tab::Performance => "Performance",
        }
    }

    pub fn index(&self) -> usize {
        Tab::ALL.iter().position(|t| t == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Dialog,
}

/// Fields a dialog prompts for, one per Enter.
pub trait DialogFields {
    const LABELS: &'static [&'static str];

    fn field(&self, index: usize) -> String;
    fn set_field(&mut self, index: usize, value: String);
}

impl DialogFields for ClientForm {
    const LABELS: &'static [&'static str] =
        &["Name", "Email", "Company", "Phone (optional)", "Status (active/inactive/lead)", "Notes (optional)"];

    fn field(&self, index: usize) -> String {
        match index {
            0 => self.name.clone(),
            1 => self.email.clone(),
            2 => self.company.clone(),
            3 => self.phone.clone(),
            4 => self.status.to_string(),
            _ => self.notes.clone(),
        }
    }

    fn set_field(&mut self, index: usize, value: String) {
        match index {
            0 => self.name = value,
            1 => self.email = value,
            2 => self.company = value,
            3 => self.phone = value,
            4 => self.status = value.parse::<ClientStatus>().unwrap_or(self.status),
            _ => self.notes = value,
        }
    }
}

impl DialogFields for IdeaForm {
    const LABELS: &'static [&'static str] = &["Title", "Description"];

    fn field(&self, index: usize) -> String {
        if index == 0 { self.title.clone() } else { self.description.clone() }
    }

    fn set_field(&mut self, index: usize, value: String) {
        if index == 0 { self.title = value } else { self.description = value }
    }
}

/// Stores the buffer into the current field and advances. Returns true once
/// the last field was entered.
fn step_dialog<F>(dialog: &mut CrudDialog<F>, field: &mut usize, buffer: &mut String) -> bool
where
    F: DialogFields + Form + Default + Clone,
{
    let Some(form) = dialog.form_mut() else { return false };
    form.set_field(*field, std::mem::take(buffer));
    if *field + 1 < F::LABELS.len() {
        *field += 1;
        *buffer = form.field(*field);
        false
    } else {
        true
    }
}

pub struct App<'a> {
    store: &'a dyn DocumentStore,
    notices: &'a NoticeBuffer,
    session: &'a Session,
    config: &'a Config,
    watch: Option<ProjectWatch>,
    pub tab: Tab,
    pub projects: Collection<Project>,
    pub clients: Collection<Client>,
    pub ideas: Collection<Idea>,
    pub entries: Collection<TimeEntry>,
    pub state: TableState,
    pub board_column: usize,
    pub input_mode: InputMode,
    pub client_dialog: CrudDialog<ClientForm>,
    pub idea_dialog: CrudDialog<IdeaForm>,
    pub field: usize,
    pub input_buffer: String,
    pub timer: Timer,
    /// Index into the project list used when the timer starts.
    pub timer_project: usize,
    pub today: NaiveDate,
}

impl<'a> App<'a> {
    /// Creates the app and loads every collection.
    pub fn new(
        store: &'a dyn DocumentStore,
        notices: &'a NoticeBuffer,
        session: &'a Session,
        config: &'a Config,
    ) -> Self {
        let watch = match ProjectService::new(store, notices).watch_projects() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "Live project updates unavailable");
                None
            }
        };
        let mut app = App {
            store,
            notices,
            session,
            config,
            watch,
            tab: Tab::MyTasks,
            projects: Collection::default(),
            clients: Collection::default(),
            ideas: Collection::default(),
            entries: Collection::default(),
            state: TableState::default(),
            board_column: 0,
            input_mode: InputMode::Normal,
            client_dialog: CrudDialog::default(),
            idea_dialog: CrudDialog::default(),
            field: 0,
            input_buffer: String::new(),
            timer: Timer::default(),
            timer_project: 0,
            today: Utc::now().date_naive(),
        };
        app.reload();
        app
    }

    fn project_service(&self) -> ProjectService<'a> {
        ProjectService::new(self.store, self.notices)
    }

    fn client_service(&self) -> ClientService<'a> {
        ClientService::new(self.store, self.notices)
    }

    fn idea_service(&self) -> IdeaService<'a> {
        IdeaService::new(self.store, self.notices)
    }

    fn time_service(&self) -> TimeEntryService<'a> {
        TimeEntryService::new(self.store, self.notices)
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    pub fn last_notice(&self) -> Option<Notice> {
        self.notices.last()
    }

    /// Re-fetches every collection.
    pub fn reload(&mut self) {
        self.projects = Collection::new(self.project_service().list_projects());
        self.clients = Collection::new(self.client_service().list_clients());
        self.ideas = Collection::new(self.idea_service().list_ideas());
        self.entries = Collection::new(self.time_service().list_time_entries(self.session.user_id()));
        self.clamp_selection();
    }

    /// Applies the newest project snapshot pushed by the store, if any.
    pub fn tick(&mut self) {
        let pushed = self.watch.as_ref().and_then(|w| w.latest());
        if let Some(projects) = pushed {
            if let Err(e) = self.projects.apply(Action::Replace(projects)) {
                tracing::warn!(error = %e, "Ignoring project snapshot");
            }
            self.clamp_selection();
        }
        self.today = Utc::now().date_naive();
    }

    fn fail<T>(&self, result: Result<T, ServiceError>, failure: &str) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!(error = %e, "{failure}");
                self.notices.notify(Notice::error(failure));
                None
            }
        }
    }

    // Rows per tab

    /// My Tasks rows in bucket order, each labelled with its bucket.
    pub fn my_task_rows(&self) -> Vec<(&'static str, ProjectTask)> {
        let buckets = bucket_tasks(&flatten_tasks(self.projects.items()), self.today);
        let label = |name: &'static str, tasks: Vec<ProjectTask>| tasks.into_iter().map(move |t| (name, t));
        label("Overdue", buckets.overdue)
            .chain(label("Today", buckets.today))
            .chain(label("Upcoming", buckets.upcoming))
            .chain(label("Completed", buckets.completed))
            .collect()
    }

    pub fn board_columns(&self) -> Vec<(TaskStatus, Vec<ProjectTask>)> {
        group_by_status(&flatten_tasks(self.projects.items()))
    }

    /// Time entries of the current week, newest first.
    pub fn week_entries(&self) -> Vec<&TimeEntry> {
        let start = start_of_week(self.today);
        let end = start + Days::new(6);
        self.entries
            .items()
            .iter()
            .filter(|e| {
                let day = e.date.date_naive();
                day >= start && day <= end
            })
            .collect()
    }

    pub fn performance(&self) -> PerformanceSummary {
        performance_summary(self.projects.items())
    }

    fn row_count(&self) -> usize {
        match self.tab {
            Tab::MyTasks => self.my_task_rows().len(),
            Tab::Board => self.board_columns().get(self.board_column).map_or(0, |(_, c)| c.len()),
            Tab::Clients => self.clients.len(),
            Tab::Ideas => self.ideas.len(),
            Tab::Time => self.week_entries().len(),
            Tab::Performance => 0,
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.row_count();
        match self.state.selected() {
            _ if count == 0 => self.state.select(None),
            Some(i) if i >= count => self.state.select(Some(count - 1)),
            None => self.state.select(Some(0)),
            Some(_) => {}
        }
    }

    // Navigation

    pub fn next(&mut self) {
        let count = self.row_count();
        if count == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < count => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let count = self.row_count();
        if count == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => count - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.state.select(None);
        self.clamp_selection();
    }

    pub fn next_tab(&mut self) {
        self.set_tab(Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()]);
    }

    pub fn previous_tab(&mut self) {
        self.set_tab(Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]);
    }

    pub fn shift_column(&mut self, forward: bool) {
        let columns = TaskStatus::COLUMNS.len();
        self.board_column = if forward {
            (self.board_column + 1).min(columns - 1)
        } else {
            self.board_column.saturating_sub(1)
        };
        self.clamp_selection();
    }

    // Tasks

    pub fn selected_task(&self) -> Option<ProjectTask> {
        let i = self.state.selected()?;
        match self.tab {
            Tab::MyTasks => self.my_task_rows().into_iter().nth(i).map(|(_, t)| t),
            Tab::Board => self
                .board_columns()
                .into_iter()
                .nth(self.board_column)
                .and_then(|(_, c)| c.into_iter().nth(i)),
            _ => None,
        }
    }

    fn write_status(&mut self, pt: &ProjectTask, status: TaskStatus) -> bool {
        let result = self.project_service().set_task_status(&pt.project_id, &pt.task.id, status);
        if self.fail(result, "Failed to update task status").is_none() {
            return false;
        }
        self.tick();
        true
    }

    /// Marks the selected task done, or reopens it.
    pub fn toggle_done(&mut self) {
        let Some(pt) = self.selected_task() else { return };
        let status = if pt.task.status == TaskStatus::Done { TaskStatus::Todo } else { TaskStatus::Done };
        self.write_status(&pt, status);
    }

    /// Moves the selected board card one column left or right.
    pub fn move_task(&mut self, forward: bool) {
        if self.tab != Tab::Board {
            return;
        }
        let Some(pt) = self.selected_task() else { return };
        let Some(status) = pt.task.status.shifted(forward) else { return };
        if self.write_status(&pt, status) {
            self.notices.notify(Notice::success(format!("'{}' moved to {}", pt.task.name, status.label())));
            self.shift_column(forward);
        }
    }

    // Deletes reach the local list only after the store accepted them.

    pub fn delete_selected(&mut self) {
        match self.tab {
            Tab::MyTasks | Tab::Board => self.delete_task(),
            Tab::Clients => self.delete_client(),
            Tab::Ideas => self.delete_idea(),
            Tab::Time => self.delete_entry(),
            Tab::Performance => {}
        }
        self.clamp_selection();
    }

    fn delete_task(&mut self) {
        let Some(pt) = self.selected_task() else { return };
        let result = self.project_service().delete_task(&pt.project_id, &pt.task.id);
        if self.fail(result, "Failed to delete task").is_none() {
            return;
        }
        if let Some(mut project) = self.projects.get(&pt.project_id).cloned() {
            project.tasks.retain(|t| t.id != pt.task.id);
            if let Err(e) = self.projects.apply(Action::Update(project)) {
                tracing::warn!(error = %e, "Local task removal skipped");
            }
        }
        self.notices.notify(Notice::success("Task deleted"));
    }

    fn delete_client(&mut self) {
        let Some(id) = self
            .state
            .selected()
            .and_then(|i| self.clients.items().get(i))
            .map(|c| c.key().to_string())
        else {
            return;
        };
        let result = self.client_service().delete_client(&id);
        if self.fail(result, "Failed to delete client").is_none() {
            return;
        }
        if let Err(e) = self.clients.apply(Action::Remove(id)) {
            tracing::warn!(error = %e, "Local client removal skipped");
        }
        self.notices.notify(Notice::success("Client deleted"));
    }

    fn delete_idea(&mut self) {
        let Some(id) = self.state.selected().and_then(|i| self.ideas.items().get(i)).map(|i| i.key().to_string()) else {
            return;
        };
        let result = self.idea_service().delete_idea(&id);
        if self.fail(result, "Failed to delete idea").is_none() {
            return;
        }
        if let Err(e) = self.ideas.apply(Action::Remove(id)) {
            tracing::warn!(error = %e, "Local idea removal skipped");
        }
        self.notices.notify(Notice::success("Idea deleted"));
    }

    fn delete_entry(&mut self) {
        let Some(id) = self
            .state
            .selected()
            .and_then(|i| self.week_entries().get(i).map(|e| e.id.clone()))
        else {
            return;
        };
        let result = self.time_service().delete_time_entry(&id);
        if self.fail(result, "Failed to delete time entry").is_none() {
            return;
        }
        if let Err(e) = self.entries.apply(Action::Remove(id)) {
            tracing::warn!(error = %e, "Local time entry removal skipped");
        }
        self.notices.notify(Notice::success("Time entry deleted"));
    }

    // Dialogs

    pub fn start_add(&mut self) {
        match self.tab {
            Tab::Clients => self.client_dialog.open_create(),
            Tab::Ideas => self.idea_dialog.open_create(),
            _ => return,
        }
        self.field = 0;
        self.input_buffer.clear();
        self.input_mode = InputMode::Dialog;
    }

    pub fn start_edit(&mut self) {
        let Some(i) = self.state.selected() else { return };
        match self.tab {
            Tab::Clients => {
                let Some(client) = self.clients.items().get(i) else { return };
                let form = ClientForm::from(client);
                self.input_buffer = form.field(0);
                self.client_dialog.open_edit(client.id.clone(), form);
            }
            Tab::Ideas => {
                let Some(idea) = self.ideas.items().get(i) else { return };
                let form = IdeaForm { title: idea.title.clone(), description: idea.description.clone() };
                self.input_buffer = form.field(0);
                self.idea_dialog.open_edit(idea.id.clone(), form);
            }
            _ => return,
        }
        self.field = 0;
        self.input_mode = InputMode::Dialog;
    }

    pub fn cancel_dialog(&mut self) {
        self.client_dialog.close();
        self.idea_dialog.close();
        self.input_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Prompt shown above the input box.
    pub fn dialog_prompt(&self) -> Option<String> {
        let (what, mode, labels) = if self.client_dialog.is_open() {
            ("client", dialog_mode(self.client_dialog.state()), ClientForm::LABELS)
        } else if self.idea_dialog.is_open() {
            ("idea", dialog_mode(self.idea_dialog.state()), IdeaForm::LABELS)
        } else {
            return None;
        };
        let verb = if matches!(mode, Some(DialogMode::Edit(_))) { "Edit" } else { "New" };
        let label = labels.get(self.field).copied().unwrap_or("");
        Some(format!("{verb} {what}: {label} ({}/{})", self.field + 1, labels.len()))
    }

    /// Enter in a dialog: store the field, advance, and submit after the last.
    pub fn handle_input(&mut self) {
        if self.client_dialog.is_open() {
            if step_dialog(&mut self.client_dialog, &mut self.field, &mut self.input_buffer) {
                self.submit_client();
            }
        } else if self.idea_dialog.is_open()
            && step_dialog(&mut self.idea_dialog, &mut self.field, &mut self.input_buffer)
        {
            self.submit_idea();
        }
    }

    fn submit_client(&mut self) {
        let (mode, input) = match self.client_dialog.submit() {
            None => return,
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                self.notices.notify(Notice::error(e.to_string()));
                return self.restart_dialog();
            }
        };
        let service = self.client_service();
        let result = match &mode {
            DialogMode::Create => service.create_client(input).map(|_| ()),
            DialogMode::Edit(id) => match self.clients.get(id) {
                Some(existing) => service.update_client(existing, input),
                None => Err(ServiceError::Store(crate::store::StoreError::NotFound {
                    collection: crate::store::CLIENTS.to_string(),
                    id: id.clone(),
                })),
            },
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to save client");
            self.notices.notify(Notice::error("Failed to save client"));
        }
        match self.client_dialog.finish(result) {
            DialogOutcome::Refresh => {
                self.notices.notify(Notice::success(match mode {
                    DialogMode::Create => "Client added",
                    DialogMode::Edit(_) => "Client updated",
                }));
                self.clients = Collection::new(self.client_service().list_clients());
                self.input_mode = InputMode::Normal;
                self.clamp_selection();
            }
            DialogOutcome::Retained => self.restart_dialog(),
            DialogOutcome::Ignored => {}
        }
    }

    fn submit_idea(&mut self) {
        let (mode, input) = match self.idea_dialog.submit() {
            None => return,
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                self.notices.notify(Notice::error(e.to_string()));
                return self.restart_dialog();
            }
        };
        let service = self.idea_service();
        let result = match &mode {
            DialogMode::Create => service.create_idea(input).map(|_| ()),
            DialogMode::Edit(id) => service.update_idea(id, input),
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to save idea");
            self.notices.notify(Notice::error("Failed to save idea"));
        }
        match self.idea_dialog.finish(result) {
            DialogOutcome::Refresh => {
                self.notices.notify(Notice::success("Idea saved"));
                self.ideas = Collection::new(self.idea_service().list_ideas());
                self.input_mode = InputMode::Normal;
                self.clamp_selection();
            }
            DialogOutcome::Retained => self.restart_dialog(),
            DialogOutcome::Ignored => {}
        }
    }

    /// Back to the first field with everything typed so far kept.
    fn restart_dialog(&mut self) {
        self.field = 0;
        self.input_buffer = if let Some(form) = self.client_dialog.form_mut() {
            form.field(0)
        } else if let Some(form) = self.idea_dialog.form_mut() {
            form.field(0)
        } else {
            String::new()
        };
    }

    // Timer

    pub fn timer_project_name(&self) -> Option<String> {
        self.projects.items().get(self.timer_project).map(|p| strip_html(&p.name))
    }

    pub fn cycle_timer_project(&mut self) {
        if self.timer.is_running() || self.projects.is_empty() {
            return;
        }
        self.timer_project = (self.timer_project + 1) % self.projects.len();
    }

    /// Starts the timer on the chosen project, or stops it and logs the time.
    pub fn toggle_timer(&mut self, now: DateTime<Utc>) {
        if !self.timer.is_running() {
            let (id, name) = self
                .projects
                .items()
                .get(self.timer_project)
                .map(|p| (p.id.clone(), strip_html(&p.name)))
                .unwrap_or_default();
            if let Err(e) = self.timer.start(&id, &name, now) {
                self.notices.notify(Notice::error(e.to_string()));
            }
            return;
        }
        let Some(entry) = self.timer.stop(now) else {
            self.notices.notify(Notice::success("Timer stopped; under a minute, nothing logged"));
            return;
        };
        let result = self.time_service().add_time_entry(self.session.user_id(), entry);
        if let Some(saved) = self.fail(result, "Failed to save time entry") {
            self.notices.notify(Notice::success(format!("Logged {:.2}h on {}", saved.hours, saved.project_name)));
            if let Err(e) = self.entries.apply(Action::Insert(saved)) {
                tracing::warn!(error = %e, "Reloading time entries");
                self.entries = Collection::new(self.time_service().list_time_entries(self.session.user_id()));
            }
            self.clamp_selection();
        }
    }

    pub fn hourly_rate(&self) -> f64 {
        self.config.hourly_rate
    }
}

fn dialog_mode<F>(state: &crate::view::DialogState<F>) -> Option<&DialogMode> {
    match state {
        crate::view::DialogState::Open { mode, .. } | crate::view::DialogState::Submitting { mode, .. } => Some(mode),
        crate::view::DialogState::Closed => None,
    }
}
