use crate::models::Keyed;

/// A change to a locally held list.
#[derive(Debug, Clone)]
pub enum Action<T> {
    /// A fresh fetch or subscription push.
    Replace(Vec<T>),
    Insert(T),
    Update(T),
    Remove(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Unknown id: {0}")]
    UnknownId(String),
}

/// A view's in-memory list. Ids are always unique.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection { items: Vec::new() }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut c = Collection::default();
        c.replace(items);
        c
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|i| i.key() == id)
    }

    /// Applies one action. A rejected action leaves the list untouched.
    pub fn apply(&mut self, action: Action<T>) -> Result<(), CollectionError> {
        match action {
            Action::Replace(items) => {
                self.replace(items);
                Ok(())
            }
            Action::Insert(item) => {
                if self.get(item.key()).is_some() {
                    return Err(CollectionError::DuplicateId(item.key().to_string()));
                }
                self.items.push(item);
                Ok(())
            }
            Action::Update(item) => {
                let slot = self
                    .items
                    .iter_mut()
                    .find(|i| i.key() == item.key())
                    .ok_or_else(|| CollectionError::UnknownId(item.key().to_string()))?;
                *slot = item;
                Ok(())
            }
            Action::Remove(id) => {
                let pos = self
                    .items
                    .iter()
                    .position(|i| i.key() == id)
                    .ok_or(CollectionError::UnknownId(id))?;
                self.items.remove(pos);
                Ok(())
            }
        }
    }

    /// Keeps the first occurrence of each id.
    fn replace(&mut self, items: Vec<T>) {
        self.items.clear();
        for item in items {
            if self.get(item.key()).is_some() {
                tracing::warn!(id = item.key(), "Dropping duplicate id from fetched list");
                continue;
            }
            self.items.push(item);
        }
    }
}
