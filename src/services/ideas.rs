use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Idea;
use crate::notify::Notifier;
use crate::store::{DocumentStore, IDEAS};
use crate::timestamp::{self, StoredDate, TimestampError};

use super::{decode_all, encode, report_fetch_failure, ServiceError};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct IdeaDoc {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<StoredDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<StoredDate>,
}

impl IdeaDoc {
    fn into_idea(self, id: String) -> Result<Idea, TimestampError> {
        Ok(Idea {
            id,
            title: self.title,
            description: self.description,
            created_at: timestamp::or_now(self.created_at.as_ref(), Utc::now())?,
            updated_at: self.updated_at.map(|d| d.to_datetime()).transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaInput {
    pub title: String,
    pub description: String,
}

pub struct IdeaService<'a> {
    store: &'a dyn DocumentStore,
    notifier: &'a dyn Notifier,
}

impl<'a> IdeaService<'a> {
    pub fn new(store: &'a dyn DocumentStore, notifier: &'a dyn Notifier) -> Self {
        IdeaService { store, notifier }
    }

    /// All ideas, newest first.
    pub fn list_ideas(&self) -> Vec<Idea> {
        match self.store.list(IDEAS) {
            Ok(docs) => {
                let mut ideas = decode_all(IDEAS, docs, IdeaDoc::into_idea);
                ideas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                ideas
            }
            Err(e) => {
                report_fetch_failure(self.notifier, "ideas", &e);
                Vec::new()
            }
        }
    }

    pub fn create_idea(&self, input: IdeaInput) -> Result<String, ServiceError> {
        let doc = IdeaDoc {
            title: input.title,
            description: input.description,
            created_at: Some(Utc::now().into()),
            updated_at: None,
        };
        let id = self.store.insert(IDEAS, encode(&doc)?).inspect_err(|e| {
            tracing::error!(error = %e, "Error adding idea");
        })?;
        Ok(id)
    }

    /// Saves edits and stamps `updatedAt`.
    pub fn update_idea(&self, id: &str, input: IdeaInput) -> Result<(), ServiceError> {
        let doc = IdeaDoc {
            title: input.title,
            description: input.description,
            created_at: None,
            updated_at: Some(Utc::now().into()),
        };
        self.store.update(IDEAS, id, encode(&doc)?).inspect_err(|e| {
            tracing::error!(error = %e, "Error updating idea");
        })?;
        Ok(())
    }

    pub fn delete_idea(&self, id: &str) -> Result<(), ServiceError> {
        self.store.delete(IDEAS, id).inspect_err(|e| {
            tracing::error!(error = %e, "Error deleting idea");
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NoticeBuffer;
    use crate::store::JsonFileStore;
    use tempfile::TempDir;

    #[test]
    fn created_idea_reads_back_intact() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let notices = NoticeBuffer::default();
        let service = IdeaService::new(&store, &notices);

        let before = Utc::now();
        let id = service
            .create_idea(IdeaInput { title: "Dark mode".into(), description: "For late nights".into() })
            .unwrap();

        let ideas = service.list_ideas();
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].id, id);
        assert_eq!(ideas[0].title, "Dark mode");
        assert_eq!(ideas[0].description, "For late nights");
        assert_eq!(ideas[0].created_at.date_naive(), before.date_naive());
        assert_eq!(ideas[0].updated_at, None);
    }

    #[test]
    fn update_stamps_updated_at_and_keeps_created_at() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let notices = NoticeBuffer::default();
        let service = IdeaService::new(&store, &notices);
        let id = service.create_idea(IdeaInput { title: "Draft".into(), description: String::new() }).unwrap();
        let created_at = service.list_ideas()[0].created_at;

        service
            .update_idea(&id, IdeaInput { title: "Offline sync".into(), description: "Queue writes".into() })
            .unwrap();

        let idea = &service.list_ideas()[0];
        assert_eq!(idea.title, "Offline sync");
        assert_eq!(idea.description, "Queue writes");
        assert_eq!(idea.created_at, created_at);
        let updated_at = idea.updated_at.expect("updatedAt stamped");
        assert!(updated_at >= created_at);
    }

    #[test]
    fn updating_a_missing_idea_fails() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let notices = NoticeBuffer::default();
        let result = IdeaService::new(&store, &notices).update_idea("nope", IdeaInput::default());
        assert!(matches!(result, Err(ServiceError::Store(_))));
    }
}
