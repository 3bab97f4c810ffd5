//! Entity fetch layer.
//!
//! Each service turns stored documents into entities exactly once, at the
//! boundary. Listing operations never fail: a broken store is logged,
//! reported to the [`Notifier`], and surfaces as an empty list. Single-entity
//! writes return a [`ServiceError`] for the caller to report.

pub mod clients;
pub mod ideas;
pub mod projects;
pub mod time_entries;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::notify::{Notice, Notifier};
use crate::store::{Document, Fields, StoreError};
use crate::timestamp::TimestampError;

pub use clients::{ClientInput, ClientService};
pub use ideas::{IdeaInput, IdeaService};
pub use projects::{NewTask, ProjectDraft, ProjectService, ProjectUpdate, TaskUpdate};
pub use time_entries::{NewTimeEntry, TimeEntryService};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not decode {collection}/{id}: {source}")]
    Decode {
        collection: &'static str,
        id: String,
        #[source]
        source: DecodeError,
    },

    #[error("Could not encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Task {task_id} not found in project {project_id}")]
    TaskNotFound { project_id: String, task_id: String },
}

/// Serializes a document body into top-level store fields.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Fields, ServiceError> {
    match serde_json::to_value(value).map_err(ServiceError::Encode)? {
        Value::Object(fields) => Ok(fields),
        other => Err(ServiceError::Encode(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

/// Parses a stored document and converts it into an entity.
pub(crate) fn decode<D, T, F>(collection: &'static str, doc: Document, convert: F) -> Result<T, ServiceError>
where
    D: DeserializeOwned,
    F: FnOnce(D, String) -> Result<T, TimestampError>,
{
    let wrap = |id: &str, source: DecodeError| ServiceError::Decode { collection, id: id.to_string(), source };
    let body: D = serde_json::from_value(Value::Object(doc.fields)).map_err(|e| wrap(&doc.id, e.into()))?;
    let id = doc.id;
    convert(body, id.clone()).map_err(|e| wrap(&id, e.into()))
}

/// Decodes every document, dropping (and logging) the ones that do not parse.
pub(crate) fn decode_all<D, T, F>(collection: &'static str, docs: Vec<Document>, convert: F) -> Vec<T>
where
    D: DeserializeOwned,
    F: Fn(D, String) -> Result<T, TimestampError>,
{
    docs.into_iter()
        .filter_map(|doc| match decode(collection, doc, &convert) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable document");
                None
            }
        })
        .collect()
}

/// Logs a failed listing and tells the user; the caller then shows an empty list.
pub(crate) fn report_fetch_failure(notifier: &dyn Notifier, what: &str, err: &StoreError) {
    tracing::error!(error = %err, "Error fetching {what}");
    notifier.notify(Notice::error(format!("Failed to load {what}")));
}
