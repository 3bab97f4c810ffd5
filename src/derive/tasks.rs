use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::{Priority, Project, Task, TaskStatus};

/// A task together with the project it was found in.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectTask {
    pub task: Task,
    pub project_id: String,
    pub project_name: String,
    pub project_priority: Priority,
}

impl ProjectTask {
    /// The task's own priority, or the project's when it has none.
    pub fn priority(&self) -> Priority {
        self.task.priority.unwrap_or(self.project_priority)
    }

    pub fn due_day(&self) -> NaiveDate {
        self.task.end_date.date_naive()
    }
}

/// Flattens nested tasks in project order, then task order.
pub fn flatten_tasks(projects: &[Project]) -> Vec<ProjectTask> {
    projects
        .iter()
        .flat_map(|p| {
            p.tasks.iter().map(move |t| ProjectTask {
                task: t.clone(),
                project_id: p.id.clone(),
                project_name: p.name.clone(),
                project_priority: p.priority,
            })
        })
        .collect()
}

/// Due-relative partition of a task list. The four groups never overlap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBuckets {
    pub overdue: Vec<ProjectTask>,
    pub today: Vec<ProjectTask>,
    pub upcoming: Vec<ProjectTask>,
    pub completed: Vec<ProjectTask>,
}

/// Days after today still counted as upcoming.
pub const UPCOMING_WINDOW_DAYS: u64 = 7;

/// Sorts tasks into overdue / today / upcoming / completed by calendar day.
///
/// Done tasks only ever land in `completed`. Not-done tasks due more than a
/// week out are in no bucket at all.
pub fn bucket_tasks(tasks: &[ProjectTask], today: NaiveDate) -> TaskBuckets {
    let horizon = today.checked_add_days(Days::new(UPCOMING_WINDOW_DAYS)).unwrap_or(NaiveDate::MAX);
    let mut buckets = TaskBuckets::default();
    for t in tasks {
        if t.task.status == TaskStatus::Done {
            buckets.completed.push(t.clone());
            continue;
        }
        let due = t.due_day();
        if due < today {
            buckets.overdue.push(t.clone());
        } else if due == today {
            buckets.today.push(t.clone());
        } else if due <= horizon {
            buckets.upcoming.push(t.clone());
        }
    }
    buckets
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

pub fn task_stats(tasks: &[ProjectTask]) -> TaskStats {
    let count = |s: TaskStatus| tasks.iter().filter(|t| t.task.status == s).count();
    TaskStats {
        total: tasks.len(),
        todo: count(TaskStatus::Todo),
        in_progress: count(TaskStatus::InProgress),
        done: count(TaskStatus::Done),
    }
}

/// Board columns in fixed order, each keeping the input order of its tasks.
pub fn group_by_status(tasks: &[ProjectTask]) -> Vec<(TaskStatus, Vec<ProjectTask>)> {
    TaskStatus::COLUMNS
        .iter()
        .map(|&status| (status, tasks.iter().filter(|t| t.task.status == status).cloned().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn task(id: &str, due_offset_days: i64, status: TaskStatus) -> Task {
        let base = Utc.with_ymd_and_hms(2025, 6, 15, 18, 30, 0).unwrap();
        let due = base + Duration::days(due_offset_days);
        Task {
            id: id.into(),
            name: format!("task {id}"),
            assignee: "You".into(),
            status,
            start_date: due,
            end_date: due,
            priority: None,
        }
    }

    fn project(id: &str, tasks: Vec<Task>) -> Project {
        let now = Utc::now();
        Project {
            id: id.into(),
            name: format!("Project {id}"),
            description: String::new(),
            client: String::new(),
            status: Default::default(),
            priority: Priority::High,
            start_date: now,
            end_date: now,
            progress: 0,
            task_count: 99,
            tasks,
            members: vec![],
            tags: vec![],
            type_label: String::new(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn ids(v: &[ProjectTask]) -> Vec<&str> {
        v.iter().map(|t| t.task.id.as_str()).collect()
    }

    #[test]
    fn flatten_keeps_order_and_parent_fields() {
        let projects = vec![
            project("a", vec![task("1", 0, TaskStatus::Todo), task("2", 1, TaskStatus::Todo)]),
            project("b", vec![]),
            project("c", vec![task("3", 2, TaskStatus::Done)]),
        ];
        let flat = flatten_tasks(&projects);
        assert_eq!(ids(&flat), vec!["1", "2", "3"]);
        assert_eq!(flat[2].project_id, "c");
        assert_eq!(flat[2].project_name, "Project c");
        assert_eq!(flat[0].priority(), Priority::High);
    }

    #[test]
    fn own_priority_wins_over_project_priority() {
        let mut t = task("1", 0, TaskStatus::Todo);
        t.priority = Some(Priority::Low);
        let flat = flatten_tasks(&[project("a", vec![t])]);
        assert_eq!(flat[0].priority(), Priority::Low);
        assert_eq!(flat[0].project_priority, Priority::High);
    }

    #[test]
    fn scenario_buckets() {
        let flat = flatten_tasks(&[project(
            "p",
            vec![
                task("1", -1, TaskStatus::Todo),
                task("2", 0, TaskStatus::Todo),
                task("3", 3, TaskStatus::InProgress),
                task("4", -5, TaskStatus::Done),
            ],
        )]);
        let b = bucket_tasks(&flat, today());
        assert_eq!(ids(&b.overdue), vec!["1"]);
        assert_eq!(ids(&b.today), vec!["2"]);
        assert_eq!(ids(&b.upcoming), vec!["3"]);
        assert_eq!(ids(&b.completed), vec!["4"]);
    }

    #[test]
    fn today_is_by_calendar_day_not_time() {
        let mut early = task("early", 0, TaskStatus::Todo);
        early.end_date = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 1).unwrap();
        let mut late = task("late", 0, TaskStatus::Todo);
        late.end_date = Utc.with_ymd_and_hms(2025, 6, 15, 23, 59, 59).unwrap();
        let b = bucket_tasks(&flatten_tasks(&[project("p", vec![early, late])]), today());
        assert_eq!(ids(&b.today), vec!["early", "late"]);
        assert!(b.overdue.is_empty());
    }

    #[test]
    fn upcoming_window_edges() {
        let flat = flatten_tasks(&[project(
            "p",
            vec![
                task("in", 7, TaskStatus::Todo),
                task("out", 8, TaskStatus::Todo),
                task("done-late", 30, TaskStatus::Done),
            ],
        )]);
        let b = bucket_tasks(&flat, today());
        assert_eq!(ids(&b.upcoming), vec!["in"]);
        assert_eq!(ids(&b.completed), vec!["done-late"]);
        assert!(b.overdue.is_empty() && b.today.is_empty());
    }

    #[test]
    fn buckets_are_disjoint_and_cover_due_or_done() {
        let statuses = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];
        let mut tasks = Vec::new();
        for offset in -10..=12 {
            for (i, s) in statuses.iter().enumerate() {
                tasks.push(task(&format!("{offset}:{i}"), offset, *s));
            }
        }
        let flat = flatten_tasks(&[project("p", tasks)]);
        let b = bucket_tasks(&flat, today());

        let mut seen: Vec<&str> = Vec::new();
        for group in [&b.overdue, &b.today, &b.upcoming, &b.completed] {
            for t in group.iter() {
                assert!(!seen.contains(&t.task.id.as_str()), "{} in two buckets", t.task.id);
                seen.push(&t.task.id);
            }
        }
        for group in [&b.overdue, &b.today, &b.upcoming] {
            assert!(group.iter().all(|t| t.task.status != TaskStatus::Done));
        }

        let horizon = today() + Duration::days(7);
        let expected = flat
            .iter()
            .filter(|t| t.task.status == TaskStatus::Done || t.due_day() <= horizon)
            .count();
        assert_eq!(seen.len(), expected);
    }

    #[test]
    fn stats_and_board_columns() {
        let flat = flatten_tasks(&[project(
            "p",
            vec![task("1", 0, TaskStatus::Done), task("2", 0, TaskStatus::Todo), task("3", 0, TaskStatus::Done)],
        )]);
        assert_eq!(task_stats(&flat), TaskStats { total: 3, todo: 1, in_progress: 0, done: 2 });

        let board = group_by_status(&flat);
        assert_eq!(board.len(), 3);
        assert_eq!(board[0].0, TaskStatus::Todo);
        assert!(board[1].1.is_empty());
        assert_eq!(ids(&board[2].1), vec!["1", "3"]);
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        assert_eq!(bucket_tasks(&[], today()), TaskBuckets::default());
        assert!(flatten_tasks(&[]).is_empty());
    }
}
