use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage of a project.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Backlog,
    #[default]
    Planned,
    Active,
    Completed,
    Cancelled,
}

/// Priority shared by projects and tasks.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Board column of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

/// Relationship stage of a client.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Lead,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 5] = [
        ProjectStatus::Backlog,
        ProjectStatus::Planned,
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Backlog => "backlog",
            ProjectStatus::Planned => "planned",
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl TaskStatus {
    /// Column order on the board.
    pub const COLUMNS: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    /// Neighbouring board column, if any.
    pub fn shifted(&self, forward: bool) -> Option<TaskStatus> {
        let idx = TaskStatus::COLUMNS.iter().position(|s| s == self)?;
        let next = if forward { idx.checked_add(1)? } else { idx.checked_sub(1)? };
        TaskStatus::COLUMNS.get(next).copied()
    }
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Lead => "lead",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(ProjectStatus, Priority, TaskStatus, ClientStatus);

macro_rules! parse_via_serde {
    ($($ty:ty),*) => {
        $(impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                serde_json::from_value(serde_json::Value::String(s.trim().to_lowercase()))
                    .map_err(|_| format!("unknown value '{}'", s))
            }
        })*
    };
}

parse_via_serde!(ProjectStatus, Priority, TaskStatus, ClientStatus);

/// A unit of delivery work. Tasks live inside their project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    /// May contain rich-text markup.
    pub name: String,
    pub description: String,
    /// Free-text client name; not linked to the clients collection.
    pub client: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Stored percentage, never recomputed from `tasks`.
    pub progress: u8,
    /// Stored count, never recomputed from `tasks`.
    pub task_count: u32,
    pub tasks: Vec<Task>,
    pub members: Vec<String>,
    pub tags: Vec<String>,
    pub type_label: String,
}

/// A unit of work inside a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub assignee: String,
    pub status: TaskStatus,
    pub start_date: DateTime<Utc>,
    /// Due date.
    pub end_date: DateTime<Utc>,
    /// Own priority; the project's applies when absent.
    pub priority: Option<Priority>,
}

/// A business relationship.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub status: ClientStatus,
    pub project_count: u32,
    pub total_value: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A freeform note.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Hours logged by one user against a project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    /// Copied from the project when the entry is logged.
    pub project_name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub hours: f64,
    pub billable: bool,
    pub created_at: DateTime<Utc>,
}

/// Anything addressed by a string id.
pub trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed_by_id {
    ($($ty:ty),*) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

keyed_by_id!(Project, Task, Client, Idea, TimeEntry);
