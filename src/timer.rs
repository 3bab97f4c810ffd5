use chrono::{DateTime, Utc};

use crate::services::NewTimeEntry;

/// Shorter runs are discarded on stop.
pub const MIN_TRACKED_SECS: i64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("Select a project before starting the timer")]
    NoProject,

    #[error("Timer is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq)]
struct Running {
    project_id: String,
    project_name: String,
    started: DateTime<Utc>,
}

/// Stopwatch that turns into a billable time entry when stopped.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    running: Option<Running>,
}

impl Timer {
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn project_name(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.project_name.as_str())
    }

    pub fn start(&mut self, project_id: &str, project_name: &str, now: DateTime<Utc>) -> Result<(), TimerError> {
        if self.running.is_some() {
            return Err(TimerError::AlreadyRunning);
        }
        if project_id.trim().is_empty() {
            return Err(TimerError::NoProject);
        }
        self.running = Some(Running {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            started: now,
        });
        Ok(())
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        self.running
            .as_ref()
            .map(|r| (now - r.started).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// Stops the timer. Returns an entry only when at least a minute passed.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<NewTimeEntry> {
        let secs = self.elapsed_secs(now);
        let running = self.running.take()?;
        if secs < MIN_TRACKED_SECS {
            tracing::debug!(secs, "Discarding short timer run");
            return None;
        }
        Some(NewTimeEntry {
            project_id: running.project_id,
            project_name: running.project_name,
            description: "Timer entry".to_string(),
            date: running.started,
            hours: round_hours(secs as f64 / 3600.0),
            billable: true,
        })
    }
}

fn round_hours(h: f64) -> f64 {
    (h * 100.0).round() / 100.0
}

/// `HH:MM:SS`, hours not wrapped at 24.
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn start_requires_a_project() {
        let mut t = Timer::default();
        assert_eq!(t.start("", "None", Utc::now()), Err(TimerError::NoProject));
        assert!(!t.is_running());
    }

    #[test]
    fn short_runs_produce_nothing() {
        let now = Utc::now();
        let mut t = Timer::default();
        t.start("p1", "Site", now).unwrap();
        assert_eq!(t.stop(now + Duration::seconds(59)), None);
        assert!(!t.is_running());
    }

    #[test]
    fn stop_rounds_hours() {
        let now = Utc::now();
        let mut t = Timer::default();
        t.start("p1", "Site", now).unwrap();
        assert_eq!(t.start("p2", "Other", now), Err(TimerError::AlreadyRunning));

        let entry = t.stop(now + Duration::seconds(5430)).unwrap();
        assert_eq!(entry.hours, 1.51);
        assert_eq!(entry.description, "Timer entry");
        assert_eq!(entry.project_id, "p1");
        assert!(entry.billable);
    }

    #[test]
    fn elapsed_format() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(3725), "01:02:05");
        assert_eq!(format_elapsed(90_000), "25:00:00");
    }
}
