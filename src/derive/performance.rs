use serde::Serialize;

use crate::models::{Priority, Project, ProjectStatus, TaskStatus};

use super::{chart_points, count_by, rate, strip_html, truncate, ChartPoint};

/// Rows shown in the progress chart.
pub const PROGRESS_ROWS: usize = 8;
const PROGRESS_NAME_LEN: usize = 20;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub name: String,
    pub progress: u8,
    pub tasks: u32,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct PerformanceSummary {
    pub total_projects: usize,
    pub completed_projects: usize,
    pub active_projects: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    /// Mean of the stored progress values.
    pub avg_progress: i64,
    pub completion_rate: i64,
    pub task_completion_rate: i64,
    pub status_data: Vec<ChartPoint>,
    pub priority_data: Vec<ChartPoint>,
    pub progress_data: Vec<ProgressRow>,
}

pub fn performance_summary(projects: &[Project]) -> PerformanceSummary {
    let total_projects = projects.len();
    let completed_projects = projects.iter().filter(|p| p.status == ProjectStatus::Completed).count();
    let active_projects = projects.iter().filter(|p| p.status == ProjectStatus::Active).count();
    let total_tasks: usize = projects.iter().map(|p| p.tasks.len()).sum();
    let completed_tasks: usize = projects
        .iter()
        .map(|p| p.tasks.iter().filter(|t| t.status == TaskStatus::Done).count())
        .sum();
    let progress_sum: f64 = projects.iter().map(|p| f64::from(p.progress)).sum();

    let status_counts = count_by(projects, |p| p.status);
    let priority_counts = count_by(projects, |p| p.priority);

    PerformanceSummary {
        total_projects,
        completed_projects,
        active_projects,
        total_tasks,
        completed_tasks,
        avg_progress: if total_projects == 0 { 0 } else { (progress_sum / total_projects as f64).round() as i64 },
        completion_rate: rate(completed_projects as f64, total_projects as f64),
        task_completion_rate: rate(completed_tasks as f64, total_tasks as f64),
        status_data: chart_points(&status_counts, &ProjectStatus::ALL),
        priority_data: chart_points(&priority_counts, &Priority::ALL),
        progress_data: projects
            .iter()
            .take(PROGRESS_ROWS)
            .map(|p| ProgressRow {
                name: truncate(&strip_html(&p.name), PROGRESS_NAME_LEN),
                progress: p.progress,
                tasks: p.task_count,
            })
            .collect(),
    }
}
