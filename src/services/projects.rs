use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Priority, Project, ProjectStatus, Task, TaskStatus};
use crate::notify::Notifier;
use crate::store::{DocumentStore, Subscription, PROJECTS};
use crate::timestamp::{StoredDate, TimestampError};

use super::{decode, decode_all, encode, report_fetch_failure, ServiceError};

/// A project as stored: camelCase fields, dates in stored form.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct ProjectDoc {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    client: String,
    #[serde(default)]
    status: ProjectStatus,
    #[serde(default)]
    priority: Priority,
    start_date: StoredDate,
    end_date: StoredDate,
    #[serde(default, deserialize_with = "percent")]
    progress: u8,
    #[serde(default)]
    task_count: u32,
    #[serde(default)]
    tasks: Vec<TaskDoc>,
    #[serde(default)]
    members: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    type_label: String,
}

/// Accepts any stored number and clamps it to a whole percentage.
fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map_or(0, |p| p.clamp(0.0, 100.0).round() as u8))
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct TaskDoc {
    id: String,
    name: String,
    #[serde(default)]
    assignee: String,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<StoredDate>,
    end_date: StoredDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
}

impl ProjectDoc {
    fn into_project(self, id: String) -> Result<Project, TimestampError> {
        let tasks = self.tasks.into_iter().map(TaskDoc::into_task).collect::<Result<Vec<_>, _>>()?;
        Ok(Project {
            id,
            name: self.name,
            description: self.description,
            client: self.client,
            status: self.status,
            priority: self.priority,
            start_date: self.start_date.to_datetime()?,
            end_date: self.end_date.to_datetime()?,
            progress: self.progress,
            task_count: self.task_count,
            tasks,
            members: self.members,
            tags: self.tags,
            type_label: self.type_label,
        })
    }

    fn from_project(p: &Project) -> Self {
        ProjectDoc {
            name: p.name.clone(),
            description: p.description.clone(),
            client: p.client.clone(),
            status: p.status,
            priority: p.priority,
            start_date: p.start_date.into(),
            end_date: p.end_date.into(),
            progress: p.progress,
            task_count: p.task_count,
            tasks: p.tasks.iter().map(TaskDoc::from_task).collect(),
            members: p.members.clone(),
            tags: p.tags.clone(),
            type_label: p.type_label.clone(),
        }
    }
}

impl TaskDoc {
    fn into_task(self) -> Result<Task, TimestampError> {
        let end_date = self.end_date.to_datetime()?;
        let start_date = match &self.start_date {
            Some(d) => d.to_datetime()?,
            None => end_date,
        };
        Ok(Task {
            id: self.id,
            name: self.name,
            assignee: self.assignee,
            status: self.status,
            start_date,
            end_date,
            priority: self.priority,
        })
    }

    fn from_task(t: &Task) -> Self {
        TaskDoc {
            id: t.id.clone(),
            name: t.name.clone(),
            assignee: t.assignee.clone(),
            status: t.status,
            start_date: Some(t.start_date.into()),
            end_date: t.end_date.into(),
            priority: t.priority,
        }
    }
}

/// Input collected by the project wizard.
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub target_date: Option<DateTime<Utc>>,
    pub deadline_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub owner_name: Option<String>,
    pub contributor_names: Vec<String>,
    pub intent: Option<String>,
    pub add_starter_tasks: bool,
}

impl ProjectDraft {
    /// Applies the wizard defaults and produces the project to store.
    pub fn into_project(self, now: DateTime<Utc>) -> Project {
        let owner = self.owner_name.unwrap_or_else(|| "You".to_string());
        let mut members: Vec<String> = Vec::new();
        for name in std::iter::once(owner).chain(self.contributor_names) {
            if !name.is_empty() && !members.contains(&name) {
                members.push(name);
            }
        }

        let tasks = if self.add_starter_tasks {
            vec![Task {
                id: uuid::Uuid::new_v4().to_string(),
                name: "Kickoff meeting".to_string(),
                assignee: "Team".to_string(),
                status: TaskStatus::Todo,
                start_date: now,
                end_date: now,
                priority: None,
            }]
        } else {
            Vec::new()
        };

        Project {
            id: String::new(),
            name: self.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled Project".to_string()),
            description: self.description.unwrap_or_default(),
            client: self.client.unwrap_or_default(),
            status: self.status.unwrap_or(ProjectStatus::Planned),
            priority: self.priority.unwrap_or(Priority::Medium),
            start_date: self.start_date.unwrap_or(now),
            end_date: self.deadline_date.or(self.target_date).unwrap_or(now),
            progress: 0,
            task_count: 0,
            tasks,
            members,
            tags: self.tags,
            type_label: self.intent.unwrap_or_else(|| "Project".to_string()),
        }
    }
}

/// Fields an edit may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub client: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
    pub members: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<StoredDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<StoredDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<Vec<TaskDoc>>,
}

impl From<ProjectUpdate> for ProjectPatch {
    fn from(u: ProjectUpdate) -> Self {
        ProjectPatch {
            name: u.name,
            description: u.description,
            client: u.client,
            status: u.status,
            priority: u.priority,
            start_date: u.start_date.map(StoredDate::from),
            end_date: u.end_date.map(StoredDate::from),
            progress: u.progress.map(|p| p.min(100)),
            members: u.members,
            tags: u.tags,
            tasks: None,
        }
    }
}

/// Input for a new task inside a project.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub assignee: Option<String>,
    pub due: DateTime<Utc>,
    pub priority: Option<Priority>,
}

/// Changes to an existing task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub assignee: Option<String>,
    pub status: Option<TaskStatus>,
    pub due: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
}

pub struct ProjectService<'a> {
    store: &'a dyn DocumentStore,
    notifier: &'a dyn Notifier,
}

impl<'a> ProjectService<'a> {
    pub fn new(store: &'a dyn DocumentStore, notifier: &'a dyn Notifier) -> Self {
        ProjectService { store, notifier }
    }

    /// All projects in store order; empty when the store cannot be read.
    pub fn list_projects(&self) -> Vec<Project> {
        match self.store.list(PROJECTS) {
            Ok(docs) => decode_all(PROJECTS, docs, ProjectDoc::into_project),
            Err(e) => {
                report_fetch_failure(self.notifier, "projects", &e);
                Vec::new()
            }
        }
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, ServiceError> {
        match self.store.get(PROJECTS, id)? {
            Some(doc) => decode(PROJECTS, doc, ProjectDoc::into_project).map(Some),
            None => Ok(None),
        }
    }

    /// Stores a project built from wizard input and returns it with its id.
    pub fn create_project(&self, draft: ProjectDraft) -> Result<Project, ServiceError> {
        let mut project = draft.into_project(Utc::now());
        let fields = encode(&ProjectDoc::from_project(&project))?;
        project.id = self.store.insert(PROJECTS, fields).inspect_err(|e| {
            tracing::error!(error = %e, "Error creating project");
        })?;
        tracing::info!(id = %project.id, "Project created");
        Ok(project)
    }

    pub fn update_project(&self, id: &str, update: ProjectUpdate) -> Result<(), ServiceError> {
        self.patch(id, update.into())
    }

    pub fn delete_project(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(PROJECTS, id).inspect_err(|e| {
            tracing::error!(error = %e, "Error deleting project");
        })?;
        tracing::info!(id, "Project deleted");
        Ok(())
    }

    /// Inserts the sample projects in one batch.
    pub fn seed_projects(&self) -> Result<usize, ServiceError> {
        let batch = sample_projects(Utc::now())
            .iter()
            .map(|p| encode(&ProjectDoc::from_project(p)))
            .collect::<Result<Vec<_>, _>>()?;
        let ids = self.store.batch_insert(PROJECTS, batch).inspect_err(|e| {
            tracing::error!(error = %e, "Error seeding projects");
        })?;
        tracing::info!(count = ids.len(), "Seeding complete");
        Ok(ids.len())
    }

    /// Live project list; every push replaces the whole list.
    pub fn watch_projects(&self) -> Result<ProjectWatch, ServiceError> {
        Ok(ProjectWatch { inner: self.store.subscribe(PROJECTS)? })
    }

    pub fn add_task(&self, project_id: &str, input: NewTask) -> Result<Task, ServiceError> {
        let mut project = self.require(project_id)?;
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            assignee: input.assignee.filter(|a| !a.trim().is_empty()).unwrap_or_else(|| "Unassigned".to_string()),
            status: TaskStatus::Todo,
            start_date: Utc::now(),
            end_date: input.due,
            priority: input.priority,
        };
        project.tasks.push(task.clone());
        self.save_tasks(&project)?;
        tracing::info!(project_id, task_id = %task.id, "Task added");
        Ok(task)
    }

    pub fn update_task(&self, project_id: &str, task_id: &str, update: TaskUpdate) -> Result<Task, ServiceError> {
        let mut project = self.require(project_id)?;
        let task = project.tasks.iter_mut().find(|t| t.id == task_id).ok_or_else(|| ServiceError::TaskNotFound {
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
        })?;
        if let Some(n) = update.name {
            task.name = n;
        }
        if let Some(a) = update.assignee {
            task.assignee = a;
        }
        if let Some(s) = update.status {
            task.status = s;
        }
        if let Some(d) = update.due {
            task.end_date = d;
        }
        if update.priority.is_some() {
            task.priority = update.priority;
        }
        let updated = task.clone();
        self.save_tasks(&project)?;
        Ok(updated)
    }

    /// Moves a task to another board column.
    pub fn set_task_status(&self, project_id: &str, task_id: &str, status: TaskStatus) -> Result<Task, ServiceError> {
        self.update_task(project_id, task_id, TaskUpdate { status: Some(status), ..Default::default() })
    }

    pub fn delete_task(&self, project_id: &str, task_id: &str) -> Result<(), ServiceError> {
        let mut project = self.require(project_id)?;
        let len_before = project.tasks.len();
        project.tasks.retain(|t| t.id != task_id);
        if project.tasks.len() == len_before {
            return Err(ServiceError::TaskNotFound {
                project_id: project_id.to_string(),
                task_id: task_id.to_string(),
            });
        }
        self.save_tasks(&project)
    }

    fn require(&self, project_id: &str) -> Result<Project, ServiceError> {
        self.get_project(project_id)?.ok_or_else(|| {
            ServiceError::Store(crate::store::StoreError::NotFound {
                collection: PROJECTS.to_string(),
                id: project_id.to_string(),
            })
        })
    }

    /// Writes back only the task list; stored counters stay as they are.
    fn save_tasks(&self, project: &Project) -> Result<(), ServiceError> {
        let patch = ProjectPatch {
            tasks: Some(project.tasks.iter().map(TaskDoc::from_task).collect()),
            ..Default::default()
        };
        self.patch(&project.id, patch)
    }

    fn patch(&self, id: &str, patch: ProjectPatch) -> Result<(), ServiceError> {
        let fields = encode(&patch)?;
        self.store.update(PROJECTS, id, fields).inspect_err(|e| {
            tracing::error!(error = %e, "Error updating project");
        })?;
        Ok(())
    }
}

/// Typed wrapper over a project subscription.
pub struct ProjectWatch {
    inner: Subscription,
}

impl ProjectWatch {
    /// Blocks for the next full project list.
    pub fn next(&self) -> Option<Vec<Project>> {
        self.inner.recv().map(|docs| decode_all(PROJECTS, docs, ProjectDoc::into_project))
    }

    /// Newest pending list, if any push arrived since the last call.
    pub fn latest(&self) -> Option<Vec<Project>> {
        self.inner.latest().map(|docs| decode_all(PROJECTS, docs, ProjectDoc::into_project))
    }
}

fn sample_task(name: &str, assignee: &str, status: TaskStatus, start: DateTime<Utc>, due: DateTime<Utc>) -> Task {
    Task {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        assignee: assignee.to_string(),
        status,
        start_date: start,
        end_date: due,
        priority: None,
    }
}

/// Demo data used by `seed_projects`, dated relative to `now`.
pub fn sample_projects(now: DateTime<Utc>) -> Vec<Project> {
    let days = Duration::days;
    vec![
        Project {
            id: String::new(),
            name: "Website redesign".to_string(),
            description: "Refresh the marketing site and move it to the new CMS.".to_string(),
            client: "Acme Corp".to_string(),
            status: ProjectStatus::Active,
            priority: Priority::High,
            start_date: now - days(21),
            end_date: now + days(30),
            progress: 45,
            task_count: 4,
            tasks: vec![
                sample_task("Audit current pages", "Sarah C", TaskStatus::Done, now - days(21), now - days(14)),
                sample_task("Wireframes", "Alex M", TaskStatus::InProgress, now - days(10), now - days(1)),
                sample_task("Content migration plan", "You", TaskStatus::Todo, now - days(2), now),
                sample_task("Design review", "Hannah L", TaskStatus::Todo, now, now + days(4)),
            ],
            members: vec!["You".into(), "Sarah C".into(), "Alex M".into(), "Hannah L".into()],
            tags: vec!["web".into(), "design".into()],
            type_label: "Client project".to_string(),
        },
        Project {
            id: String::new(),
            name: "<p>Mobile banking app</p>".to_string(),
            description: "Native app MVP for Global Finance.".to_string(),
            client: "Global Finance Ltd".to_string(),
            status: ProjectStatus::Planned,
            priority: Priority::Urgent,
            start_date: now + days(7),
            end_date: now + days(120),
            progress: 0,
            task_count: 2,
            tasks: vec![
                sample_task("Requirements workshop", "You", TaskStatus::Todo, now + days(7), now + days(7)),
                sample_task("Security review", "Mike R", TaskStatus::Todo, now + days(10), now + days(20)),
            ],
            members: vec!["You".into(), "Mike R".into()],
            tags: vec!["mobile".into()],
            type_label: "Client project".to_string(),
        },
        Project {
            id: String::new(),
            name: "Internal tooling cleanup".to_string(),
            description: String::new(),
            client: String::new(),
            status: ProjectStatus::Completed,
            priority: Priority::Low,
            start_date: now - days(60),
            end_date: now - days(5),
            progress: 100,
            task_count: 1,
            tasks: vec![sample_task("Remove dead scripts", "Alex M", TaskStatus::Done, now - days(60), now - days(6))],
            members: vec!["Alex M".into()],
            tags: vec!["internal".into()],
            type_label: "Internal".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn draft_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let p = ProjectDraft::default().into_project(now);
        assert_eq!(p.name, "Untitled Project");
        assert_eq!(p.status, ProjectStatus::Planned);
        assert_eq!(p.priority, Priority::Medium);
        assert_eq!(p.start_date, now);
        assert_eq!(p.end_date, now);
        assert_eq!(p.members, vec!["You".to_string()]);
        assert!(p.tasks.is_empty());
    }

    #[test]
    fn draft_prefers_deadline_and_dedupes_members() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let deadline = now + Duration::days(9);
        let draft = ProjectDraft {
            title: Some("Launch".into()),
            target_date: Some(now + Duration::days(3)),
            deadline_date: Some(deadline),
            owner_name: Some("Dana".into()),
            contributor_names: vec!["Lee".into(), "Dana".into(), String::new(), "Lee".into()],
            add_starter_tasks: true,
            ..Default::default()
        };
        let p = draft.into_project(now);
        assert_eq!(p.end_date, deadline);
        assert_eq!(p.members, vec!["Dana".to_string(), "Lee".to_string()]);
        assert_eq!(p.tasks.len(), 1);
        assert_eq!(p.tasks[0].name, "Kickoff meeting");
        assert_eq!(p.tasks[0].assignee, "Team");
        assert_eq!(p.task_count, 0);
    }

    #[test]
    fn stored_progress_is_clamped_to_a_percentage() {
        for (raw, expected) in [(json!(45.5), 46), (json!(300), 100), (json!(-4), 0), (json!(null), 0)] {
            let doc: ProjectDoc = serde_json::from_value(json!({
                "name": "Site",
                "startDate": "2024-01-01",
                "endDate": "2024-02-01",
                "progress": raw
            }))
            .unwrap();
            assert_eq!(doc.into_project("p1".into()).unwrap().progress, expected);
        }
    }

    #[test]
    fn legacy_task_dates_are_accepted() {
        let raw = serde_json::json!({
            "name": "Legacy",
            "startDate": "2024-01-01",
            "endDate": 1706745600000i64,
            "tasks": [{"id": "t1", "name": "Old", "endDate": "2024-02-01T00:00:00Z"}]
        });
        let doc: ProjectDoc = serde_json::from_value(raw).unwrap();
        let p = doc.into_project("p1".into()).unwrap();
        assert_eq!(p.end_date, Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(p.tasks[0].start_date, p.tasks[0].end_date);
        assert_eq!(p.tasks[0].status, TaskStatus::Todo);
    }
}
