use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PROJECTS: &str = "projects";
pub const CLIENTS: &str = "clients";
pub const IDEAS: &str = "ideas";
pub const TIME_ENTRIES: &str = "time_entries";

/// Top-level fields of a document, without its id.
pub type Fields = Map<String, Value>;

/// A stored document: its id plus whatever fields it was written with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed collection '{collection}': {source}")]
    Malformed {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Live view of one collection. The first message is the snapshot at
/// subscription time; every write to the collection pushes a full new one.
pub struct Subscription {
    rx: Receiver<Vec<Document>>,
}

impl Subscription {
    /// Blocks until the next snapshot. `None` once the store is gone.
    pub fn recv(&self) -> Option<Vec<Document>> {
        self.rx.recv().ok()
    }

    /// Most recent pending snapshot, skipping older ones.
    pub fn latest(&self) -> Option<Vec<Document>> {
        self.rx.try_iter().last()
    }
}

/// Collection-oriented document storage.
pub trait DocumentStore {
    /// All documents of a collection in insertion order.
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.list(collection)?.into_iter().find(|d| d.id == id))
    }

    /// Stores a new document and returns its generated id.
    fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merges `patch` into the top-level fields of an existing document.
    fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError>;

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Inserts every document or none of them.
    fn batch_insert(&self, collection: &str, batch: Vec<Fields>) -> Result<Vec<String>, StoreError>;

    fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError>;
}

/// One pretty-printed JSON array per collection inside `dir`.
pub struct JsonFileStore {
    dir: PathBuf,
    subscribers: Mutex<HashMap<String, Vec<Sender<Vec<Document>>>>>,
}

impl JsonFileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        tracing::debug!(dir = %dir.display(), "Opened document store");
        Ok(JsonFileStore { dir, subscribers: Mutex::new(HashMap::new()) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    fn read(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let io_err = |source| StoreError::Io { path: path.clone(), source };
        let mut f = OpenOptions::new().read(true).open(&path).map_err(io_err)?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(io_err)?;
        if s.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&s).map_err(|source| StoreError::Malformed { collection: collection.to_string(), source })
    }

    /// Replaces the collection file in one rename so readers never see a
    /// half-written array.
    fn write(&self, collection: &str, docs: &[Document]) -> Result<(), StoreError> {
        let path = self.collection_path(collection);
        let tmp = self.dir.join(format!(".{collection}.json.tmp"));
        let s = serde_json::to_string_pretty(docs)
            .map_err(|source| StoreError::Malformed { collection: collection.to_string(), source })?;
        let io_err = |source| StoreError::Io { path: tmp.clone(), source };
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(io_err)?;
        f.write_all(s.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path: path.clone(), source })?;
        self.publish(collection, docs)
    }

    fn publish(&self, collection: &str, docs: &[Document]) -> Result<(), StoreError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(senders) = subscribers.get_mut(collection) {
            senders.retain(|tx| tx.send(docs.to_vec()).is_ok());
        }
        Ok(())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound { collection: collection.to_string(), id: id.to_string() }
    }
}

fn new_document(mut fields: Fields) -> Document {
    fields.remove("id");
    Document { id: uuid::Uuid::new_v4().to_string(), fields }
}

impl DocumentStore for JsonFileStore {
    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.read(collection)
    }

    fn insert(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let mut docs = self.read(collection)?;
        let doc = new_document(fields);
        let id = doc.id.clone();
        docs.push(doc);
        self.write(collection, &docs)?;
        tracing::debug!(collection, %id, "Inserted document");
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<(), StoreError> {
        let mut docs = self.read(collection)?;
        let doc = docs.iter_mut().find(|d| d.id == id).ok_or_else(|| Self::not_found(collection, id))?;
        for (key, value) in patch {
            if key != "id" {
                doc.fields.insert(key, value);
            }
        }
        self.write(collection, &docs)?;
        tracing::debug!(collection, id, "Updated document");
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut docs = self.read(collection)?;
        let len_before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == len_before {
            return Err(Self::not_found(collection, id));
        }
        self.write(collection, &docs)?;
        tracing::debug!(collection, id, "Deleted document");
        Ok(())
    }

    fn batch_insert(&self, collection: &str, batch: Vec<Fields>) -> Result<Vec<String>, StoreError> {
        let mut docs = self.read(collection)?;
        let new_docs: Vec<Document> = batch.into_iter().map(new_document).collect();
        let ids = new_docs.iter().map(|d| d.id.clone()).collect();
        docs.extend(new_docs);
        self.write(collection, &docs)?;
        Ok(ids)
    }

    fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::channel();
        // An unreadable collection still yields a subscription; the first
        // snapshot just comes with the next successful write.
        match self.read(collection) {
            Ok(initial) => {
                let _ = tx.send(initial);
            }
            Err(e) => tracing::warn!(collection, error = %e, "Initial snapshot unavailable"),
        }
        let mut subscribers = self.subscribers.lock().map_err(|_| StoreError::Poisoned)?;
        subscribers.entry(collection.to_string()).or_default().push(tx);
        Ok(Subscription { rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        }
    }

    #[test]
    fn missing_collection_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.list(IDEAS).unwrap().is_empty());
    }

    #[test]
    fn insert_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        let id = store.insert(IDEAS, fields(json!({"title": "a", "id": "ignored"}))).unwrap();
        assert_ne!(id, "ignored");

        store.update(IDEAS, &id, fields(json!({"title": "b", "extra": 1}))).unwrap();
        let doc = store.get(IDEAS, &id).unwrap().unwrap();
        assert_eq!(doc.fields["title"], "b");
        assert_eq!(doc.fields["extra"], 1);

        store.delete(IDEAS, &id).unwrap();
        assert!(store.get(IDEAS, &id).unwrap().is_none());
        assert!(matches!(store.delete(IDEAS, &id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn update_of_missing_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let err = store.update(CLIENTS, "nope", Fields::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn malformed_file_is_an_error_not_an_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("projects.json"), "{ not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.list(PROJECTS), Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn subscribers_receive_full_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.insert(PROJECTS, fields(json!({"name": "one"}))).unwrap();

        let sub = store.subscribe(PROJECTS).unwrap();
        assert_eq!(sub.recv().unwrap().len(), 1);

        store.batch_insert(PROJECTS, vec![fields(json!({"name": "two"})), fields(json!({"name": "three"}))]).unwrap();
        store.insert(CLIENTS, fields(json!({"name": "unrelated"}))).unwrap();

        let latest = sub.latest().unwrap();
        assert_eq!(latest.len(), 3);
        assert!(sub.latest().is_none());
    }
}
