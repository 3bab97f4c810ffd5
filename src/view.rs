//! View-state resolution, form validation and the CRUD dialog state machine
//! shared by every screen.

use chrono::{DateTime, Utc};

use crate::models::{ClientStatus, Priority, ProjectStatus};
use crate::services::{ClientInput, IdeaInput, NewTask, NewTimeEntry, ProjectUpdate};
use crate::timestamp::parse_day;

/// What a list screen shows for a given (loading, data) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    /// Nothing to show; offers the named creation action.
    Empty { create_label: &'static str },
    Ready(Vec<T>),
}

impl<T> ViewState<T> {
    pub fn resolve(loading: bool, items: Vec<T>, create_label: &'static str) -> Self {
        if loading {
            ViewState::Loading
        } else if items.is_empty() {
            ViewState::Empty { create_label }
        } else {
            ViewState::Ready(items)
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields ({0} is missing)")]
    Missing(&'static str),

    #[error("Hours must be greater than zero")]
    NonPositiveHours,

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),
}

/// Dialog input that must be checked before anything is written.
pub trait Form {
    type Output;

    fn validate(&self) -> Result<Self::Output, ValidationError>;
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(v.to_string())
}

fn optional(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

fn day(value: &str, field: &'static str) -> Result<DateTime<Utc>, ValidationError> {
    let v = required(value, field)?;
    parse_day(&v).map_err(|_| ValidationError::InvalidDate(v))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientForm {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub status: ClientStatus,
    pub notes: String,
}

impl Form for ClientForm {
    type Output = ClientInput;

    fn validate(&self) -> Result<ClientInput, ValidationError> {
        Ok(ClientInput {
            name: required(&self.name, "name")?,
            email: required(&self.email, "email")?,
            company: required(&self.company, "company")?,
            phone: optional(&self.phone),
            status: self.status,
            notes: optional(&self.notes),
        })
    }
}

impl From<&crate::models::Client> for ClientForm {
    fn from(c: &crate::models::Client) -> Self {
        ClientForm {
            name: c.name.clone(),
            email: c.email.clone(),
            company: c.company.clone(),
            phone: c.phone.clone().unwrap_or_default(),
            status: c.status,
            notes: c.notes.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaForm {
    pub title: String,
    pub description: String,
}

impl Form for IdeaForm {
    type Output = IdeaInput;

    fn validate(&self) -> Result<IdeaInput, ValidationError> {
        Ok(IdeaInput {
            title: required(&self.title, "title")?,
            description: self.description.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub name: String,
    pub project_id: String,
    pub due: String,
    pub assignee: String,
    pub priority: Option<Priority>,
}

impl Form for TaskForm {
    /// Target project id and the task to add.
    type Output = (String, NewTask);

    fn validate(&self) -> Result<(String, NewTask), ValidationError> {
        let name = required(&self.name, "name")?;
        let project_id = required(&self.project_id, "project")?;
        let due = day(&self.due, "due date")?;
        Ok((project_id, NewTask { name, assignee: optional(&self.assignee), due, priority: self.priority }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntryForm {
    pub project_id: String,
    pub project_name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub hours: f64,
    pub billable: bool,
}

impl Form for TimeEntryForm {
    type Output = NewTimeEntry;

    fn validate(&self) -> Result<NewTimeEntry, ValidationError> {
        let project_id = required(&self.project_id, "project")?;
        if !(self.hours > 0.0) {
            return Err(ValidationError::NonPositiveHours);
        }
        Ok(NewTimeEntry {
            project_id,
            project_name: optional(&self.project_name).unwrap_or_else(|| "Unknown".to_string()),
            description: optional(&self.description).unwrap_or_else(|| "Manual entry".to_string()),
            date: self.date,
            hours: self.hours,
            billable: self.billable,
        })
    }
}

/// Project edits. Blank text leaves a field unchanged; only the end date is
/// checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectEditForm {
    pub name: String,
    pub description: String,
    pub client: String,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub end_date: String,
    pub progress: Option<u8>,
}

impl Form for ProjectEditForm {
    type Output = ProjectUpdate;

    fn validate(&self) -> Result<ProjectUpdate, ValidationError> {
        let end_date = match optional(&self.end_date) {
            Some(_) => Some(day(&self.end_date, "end date")?),
            None => None,
        };
        Ok(ProjectUpdate {
            name: optional(&self.name),
            description: optional(&self.description),
            client: optional(&self.client),
            status: self.status,
            priority: self.priority,
            end_date,
            progress: self.progress,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogMode {
    Create,
    Edit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState<F> {
    Closed,
    Open { mode: DialogMode, form: F, error: Option<String> },
    /// A validated submission is being written.
    Submitting { mode: DialogMode, form: F },
}

/// What the screen should do after the dialog settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Closed after a successful write; re-fetch the list.
    Refresh,
    /// Still open with an error notice.
    Retained,
    /// Nothing was in flight.
    Ignored,
}

/// Create/edit dialog: closed → open → submit → closed(+refresh) or back to
/// open with the fields kept.
#[derive(Debug, Clone)]
pub struct CrudDialog<F> {
    state: DialogState<F>,
}

impl<F> Default for CrudDialog<F> {
    fn default() -> Self {
        CrudDialog { state: DialogState::Closed }
    }
}

impl<F: Form + Default + Clone> CrudDialog<F> {
    pub fn state(&self) -> &DialogState<F> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, DialogState::Closed)
    }

    pub fn open_create(&mut self) {
        self.state = DialogState::Open { mode: DialogMode::Create, form: F::default(), error: None };
    }

    pub fn open_edit(&mut self, id: impl Into<String>, form: F) {
        self.state = DialogState::Open { mode: DialogMode::Edit(id.into()), form, error: None };
    }

    pub fn close(&mut self) {
        self.state = DialogState::Closed;
    }

    /// Editable form while the dialog is open.
    pub fn form_mut(&mut self) -> Option<&mut F> {
        match &mut self.state {
            DialogState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Validates the form. On success the dialog waits for [`finish`] and the
    /// caller performs the write; on failure it stays open with the error and
    /// no write must happen.
    ///
    /// [`finish`]: CrudDialog::finish
    pub fn submit(&mut self) -> Option<Result<(DialogMode, F::Output), ValidationError>> {
        let DialogState::Open { mode, form, error } = &mut self.state else {
            return None;
        };
        match form.validate() {
            Ok(output) => {
                let mode = mode.clone();
                self.state = DialogState::Submitting { mode: mode.clone(), form: form.clone() };
                Some(Ok((mode, output)))
            }
            Err(e) => {
                *error = Some(e.to_string());
                Some(Err(e))
            }
        }
    }

    /// Settles a submission with the result of the write.
    pub fn finish<E: std::fmt::Display>(&mut self, result: Result<(), E>) -> DialogOutcome {
        let state = std::mem::replace(&mut self.state, DialogState::Closed);
        match (state, result) {
            (DialogState::Submitting { .. }, Ok(())) => DialogOutcome::Refresh,
            (DialogState::Submitting { mode, form }, Err(e)) => {
                self.state = DialogState::Open { mode, form, error: Some(e.to_string()) };
                DialogOutcome::Retained
            }
            (other, _) => {
                self.state = other;
                DialogOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn view_state_mapping() {
        assert_eq!(ViewState::resolve(true, vec![1], "New"), ViewState::Loading);
        assert_eq!(
            ViewState::<i32>::resolve(false, vec![], "New client"),
            ViewState::Empty { create_label: "New client" }
        );
        assert_eq!(ViewState::resolve(false, vec![1, 2], "New"), ViewState::Ready(vec![1, 2]));
    }

    fn filled() -> ClientForm {
        ClientForm {
            name: "Acme".into(),
            email: "a@acme.test".into(),
            company: "Acme Corp".into(),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_submit_keeps_dialog_open() {
        let mut dialog: CrudDialog<ClientForm> = CrudDialog::default();
        dialog.open_create();
        dialog.form_mut().unwrap().name = "Acme".into();

        assert_matches!(dialog.submit(), Some(Err(ValidationError::Missing("email"))));
        assert_matches!(dialog.state(), DialogState::Open { error: Some(_), form, .. } if form.name == "Acme");
    }

    #[test]
    fn successful_write_closes_and_refreshes() {
        let mut dialog: CrudDialog<ClientForm> = CrudDialog::default();
        dialog.open_create();
        *dialog.form_mut().unwrap() = filled();

        let (mode, input) = dialog.submit().unwrap().unwrap();
        assert_eq!(mode, DialogMode::Create);
        assert_eq!(input.phone, None);
        assert_matches!(dialog.state(), DialogState::Submitting { .. });

        assert_eq!(dialog.finish::<String>(Ok(())), DialogOutcome::Refresh);
        assert!(!dialog.is_open());
    }

    #[test]
    fn failed_write_reopens_with_fields_retained() {
        let mut dialog: CrudDialog<ClientForm> = CrudDialog::default();
        dialog.open_edit("c1", filled());
        dialog.submit().unwrap().unwrap();

        assert_eq!(dialog.finish(Err("store offline")), DialogOutcome::Retained);
        assert_matches!(
            dialog.state(),
            DialogState::Open { mode: DialogMode::Edit(id), form, error: Some(msg) }
                if id == "c1" && form.company == "Acme Corp" && msg == "store offline"
        );
    }

    #[test]
    fn finish_without_submission_is_ignored() {
        let mut dialog: CrudDialog<IdeaForm> = CrudDialog::default();
        assert_eq!(dialog.finish::<String>(Ok(())), DialogOutcome::Ignored);
        assert!(dialog.submit().is_none());
    }

    #[test]
    fn task_form_requires_name_project_and_due() {
        let mut form = TaskForm { name: "Write".into(), project_id: "p1".into(), ..Default::default() };
        assert_eq!(form.validate().unwrap_err(), ValidationError::Missing("due date"));
        form.due = "13/01/2025".into();
        assert_matches!(form.validate(), Err(ValidationError::InvalidDate(_)));
        form.due = "2025-01-13".into();
        let (project_id, task) = form.validate().unwrap();
        assert_eq!(project_id, "p1");
        assert_eq!(task.assignee, None);
    }

    #[test]
    fn time_entry_form_rejects_zero_hours() {
        let mut form = TimeEntryForm {
            project_id: "p1".into(),
            project_name: String::new(),
            description: String::new(),
            date: Utc::now(),
            hours: 0.0,
            billable: true,
        };
        assert_eq!(form.validate().unwrap_err(), ValidationError::NonPositiveHours);
        form.hours = 1.5;
        let entry = form.validate().unwrap();
        assert_eq!(entry.description, "Manual entry");
        assert_eq!(entry.project_name, "Unknown");
    }

    #[test]
    fn project_edit_checks_only_the_end_date() {
        let mut form = ProjectEditForm { name: " Relaunch ".into(), end_date: "soon".into(), ..Default::default() };
        assert_eq!(form.validate().unwrap_err(), ValidationError::InvalidDate("soon".into()));
        form.end_date.clear();
        let update = form.validate().unwrap();
        assert_eq!(update.name.as_deref(), Some("Relaunch"));
        assert!(update.end_date.is_none() && update.client.is_none());
    }

    #[test]
    fn blank_idea_title_is_rejected() {
        let form = IdeaForm { title: "   ".into(), description: "x".into() };
        assert_eq!(form.validate(), Err(ValidationError::Missing("title")));
    }
}
