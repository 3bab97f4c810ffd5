use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TimeEntry;
use crate::notify::Notifier;
use crate::store::{DocumentStore, TIME_ENTRIES};
use crate::timestamp::{StoredDate, TimestampError};

use super::{decode_all, encode, report_fetch_failure, ServiceError};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct TimeEntryDoc {
    user_id: String,
    project_id: String,
    #[serde(default)]
    project_name: String,
    #[serde(default, alias = "taskDescription")]
    description: String,
    date: StoredDate,
    hours: f64,
    #[serde(default)]
    billable: bool,
    created_at: StoredDate,
}

impl TimeEntryDoc {
    fn into_entry(self, id: String) -> Result<TimeEntry, TimestampError> {
        Ok(TimeEntry {
            id,
            user_id: self.user_id,
            project_id: self.project_id,
            project_name: self.project_name,
            description: self.description,
            date: self.date.to_datetime()?,
            hours: self.hours,
            billable: self.billable,
            created_at: self.created_at.to_datetime()?,
        })
    }
}

/// An entry about to be logged; the session supplies the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTimeEntry {
    pub project_id: String,
    pub project_name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub hours: f64,
    pub billable: bool,
}

pub struct TimeEntryService<'a> {
    store: &'a dyn DocumentStore,
    notifier: &'a dyn Notifier,
}

impl<'a> TimeEntryService<'a> {
    pub fn new(store: &'a dyn DocumentStore, notifier: &'a dyn Notifier) -> Self {
        TimeEntryService { store, notifier }
    }

    /// Entries belonging to `user_id`, most recent date first.
    pub fn list_time_entries(&self, user_id: &str) -> Vec<TimeEntry> {
        match self.store.list(TIME_ENTRIES) {
            Ok(docs) => {
                let mut entries: Vec<TimeEntry> = decode_all(TIME_ENTRIES, docs, TimeEntryDoc::into_entry)
                    .into_iter()
                    .filter(|e| e.user_id == user_id)
                    .collect();
                entries.sort_by(|a, b| b.date.cmp(&a.date));
                entries
            }
            Err(e) => {
                report_fetch_failure(self.notifier, "time entries", &e);
                Vec::new()
            }
        }
    }

    pub fn add_time_entry(&self, user_id: &str, entry: NewTimeEntry) -> Result<TimeEntry, ServiceError> {
        let now = Utc::now();
        let doc = TimeEntryDoc {
            user_id: user_id.to_string(),
            project_id: entry.project_id.clone(),
            project_name: entry.project_name.clone(),
            description: entry.description.clone(),
            date: entry.date.into(),
            hours: entry.hours,
            billable: entry.billable,
            created_at: now.into(),
        };
        let id = self.store.insert(TIME_ENTRIES, encode(&doc)?).inspect_err(|e| {
            tracing::error!(error = %e, "Error adding time entry");
        })?;
        tracing::info!(%id, hours = entry.hours, "Time entry logged");
        Ok(TimeEntry {
            id,
            user_id: user_id.to_string(),
            project_id: entry.project_id,
            project_name: entry.project_name,
            description: entry.description,
            date: entry.date,
            hours: entry.hours,
            billable: entry.billable,
            created_at: now,
        })
    }

    pub fn delete_time_entry(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(TIME_ENTRIES, id).inspect_err(|e| {
            tracing::error!(error = %e, "Error deleting time entry");
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeBuffer;
    use crate::store::JsonFileStore;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(day: u32, hours: f64) -> NewTimeEntry {
        NewTimeEntry {
            project_id: "p1".into(),
            project_name: "Site".into(),
            description: "Design".into(),
            date: Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap(),
            hours,
            billable: true,
        }
    }

    #[test]
    fn lists_only_own_entries_newest_first() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let notices = NoticeBuffer::default();
        let service = TimeEntryService::new(&store, &notices);

        service.add_time_entry("me", entry(3, 1.0)).unwrap();
        service.add_time_entry("other", entry(4, 2.0)).unwrap();
        service.add_time_entry("me", entry(5, 3.0)).unwrap();

        let mine = service.list_time_entries("me");
        let hours: Vec<f64> = mine.iter().map(|e| e.hours).collect();
        assert_eq!(hours, vec![3.0, 1.0]);
        assert!(notices.take().is_empty());
    }

    #[test]
    fn legacy_description_key_and_bad_rows() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let notices = NoticeBuffer::default();
        let legacy = json!({
            "userId": "me",
            "projectId": "p1",
            "taskDescription": "Review",
            "date": {"seconds": 1_740_787_200i64, "nanoseconds": 0},
            "hours": 1.5,
            "createdAt": "2025-03-01"
        });
        let broken = json!({
            "userId": "me",
            "projectId": "p1",
            "date": "soon",
            "hours": 1.0,
            "createdAt": "2025-03-01"
        });
        for doc in [legacy, broken] {
            let serde_json::Value::Object(fields) = doc else { unreachable!() };
            store.insert(TIME_ENTRIES, fields).unwrap();
        }

        let entries = TimeEntryService::new(&store, &notices).list_time_entries("me");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Review");
        assert!(!entries[0].billable);
        assert_eq!(entries[0].date, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    }
}
