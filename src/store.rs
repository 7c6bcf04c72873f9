use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{KeyValueStore, StorageError};

pub const DEFAULT_KEY: &str = "todos";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn from_completed(completed: bool) -> Self {
        if completed {
            Status::Completed
        } else {
            Status::Pending
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, Status::Completed)
    }
}

/// Opaque identity assigned when an item enters memory. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(skip)]
    pub id: ItemId,
    pub name: String,
    pub status: Status,
}

impl Item {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            status: Status::Pending,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("index {index} is out of range for a list of {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no item with id {0:?}")]
    UnknownItem(ItemId),
    #[error("persisting list")]
    Persist(#[source] StorageError),
}

/// Authoritative ordered list plus its durable mirror.
///
/// Every mutating call either persists the whole list or, when the write fails,
/// restores the previous contents so memory and store never diverge.
#[derive(Debug)]
pub struct ListStore<S> {
    items: Vec<Item>,
    backend: S,
    key: String,
}

impl<S: KeyValueStore> ListStore<S> {
    pub fn load(backend: S) -> Self {
        Self::load_with_key(backend, DEFAULT_KEY)
    }

    /// Reads the snapshot under `key`. A missing, unreadable or malformed snapshot
    /// yields an empty list.
    pub fn load_with_key(backend: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = match backend.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Item>>(&raw) {
                Ok(items) => items,
                Err(err) => {
                    tracing::warn!(%err, %key, "discarding unparsable list snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(?err, %key, "list snapshot unreadable, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(count = items.len(), %key, "loaded list");
        Self {
            items,
            backend,
            key,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.items.iter().filter(|item| !item.is_completed()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed()).count()
    }

    /// Prepends a pending item. Returns the new id, or `None` when `name` is blank.
    pub fn add(&mut self, name: &str) -> Result<Option<ItemId>, ListError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let item = Item::pending(trimmed);
        let id = item.id;
        self.mutate(|items| items.insert(0, item))?;
        tracing::info!(?id, "added item");
        Ok(Some(id))
    }

    pub fn set_status(&mut self, index: usize, completed: bool) -> Result<(), ListError> {
        self.check_index(index)?;
        let status = Status::from_completed(completed);
        self.mutate(|items| items[index].status = status)?;
        tracing::info!(index, %status, "updated item status");
        Ok(())
    }

    pub fn set_status_by_id(&mut self, id: ItemId, completed: bool) -> Result<(), ListError> {
        let index = self.resolve(id)?;
        self.set_status(index, completed)
    }

    /// Flips the status of `id` and returns the new value.
    pub fn toggle_by_id(&mut self, id: ItemId) -> Result<Status, ListError> {
        let index = self.resolve(id)?;
        let completed = !self.items[index].is_completed();
        self.set_status(index, completed)?;
        Ok(Status::from_completed(completed))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Item, ListError> {
        self.check_index(index)?;
        let removed = self.items[index].clone();
        self.mutate(|items| {
            items.remove(index);
        })?;
        tracing::info!(index, id = ?removed.id, "removed item");
        Ok(removed)
    }

    pub fn remove_by_id(&mut self, id: ItemId) -> Result<Item, ListError> {
        let index = self.resolve(id)?;
        self.remove_at(index)
    }

    /// Empties the list. Returns how many items were dropped.
    pub fn clear(&mut self) -> Result<usize, ListError> {
        let count = self.items.len();
        self.mutate(Vec::clear)?;
        tracing::info!(count, "cleared list");
        Ok(count)
    }

    fn resolve(&self, id: ItemId) -> Result<usize, ListError> {
        self.position_of(id).ok_or_else(|| {
            tracing::warn!(?id, "item id no longer present");
            ListError::UnknownItem(id)
        })
    }

    fn check_index(&self, index: usize) -> Result<(), ListError> {
        let len = self.items.len();
        if index < len {
            return Ok(());
        }
        tracing::warn!(index, len, "ignoring out-of-range list index");
        Err(ListError::IndexOutOfRange { index, len })
    }

    fn mutate<F>(&mut self, f: F) -> Result<(), ListError>
    where
        F: FnOnce(&mut Vec<Item>),
    {
        let previous = self.items.clone();
        f(&mut self.items);
        if let Err(err) = self.persist() {
            tracing::error!(?err, key = %self.key, "persist failed, restoring previous list");
            self.items = previous;
            return Err(ListError::Persist(err));
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.items).map_err(|source| {
            StorageError::Serialize {
                key: self.key.clone(),
                source,
            }
        })?;
        self.backend.set(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn names(store: &ListStore<MemoryStore>) -> Vec<&str> {
        store.items().iter().map(|item| item.name.as_str()).collect()
    }

    fn persisted(store: &ListStore<MemoryStore>) -> Vec<Item> {
        let raw = store.backend().raw(store.key()).expect("snapshot present");
        serde_json::from_str(raw).expect("snapshot parses")
    }

    fn assert_mirrored(store: &ListStore<MemoryStore>) {
        let snapshot = persisted(store);
        assert_eq!(snapshot.len(), store.len());
        for (stored, live) in snapshot.iter().zip(store.items()) {
            assert_eq!(stored.name, live.name);
            assert_eq!(stored.status, live.status);
        }
    }

    #[test]
    fn add_is_first_and_pending_after_restart() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let mut store = ListStore::load(FileStore::open(temp.path())?);
        store.add("older")?;
        store.add("  newest  ")?;

        let reloaded = ListStore::load(FileStore::open(temp.path())?);
        let first = reloaded.get(0).expect("first item");
        assert_eq!(first.name, "newest");
        assert_eq!(first.status, Status::Pending);
        assert_eq!(reloaded.len(), 2);
        Ok(())
    }

    #[test]
    fn blank_names_are_ignored() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("keep")?;
        assert_eq!(store.add("")?, None);
        assert_eq!(store.add("   ")?, None);
        assert_eq!(names(&store), vec!["keep"]);
        Ok(())
    }

    #[test]
    fn snapshot_tracks_every_mutation() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("a")?;
        assert_mirrored(&store);
        store.add("b")?;
        assert_mirrored(&store);
        store.set_status(1, true)?;
        assert_mirrored(&store);
        store.add("c")?;
        assert_mirrored(&store);
        store.remove_at(0)?;
        assert_mirrored(&store);
        store.set_status(1, false)?;
        assert_mirrored(&store);
        assert_eq!(names(&store), vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn snapshot_uses_plain_name_status_objects() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("write docs")?;
        store.set_status(0, true)?;
        assert_eq!(
            store.backend().raw(DEFAULT_KEY),
            Some(r#"[{"name":"write docs","status":"completed"}]"#)
        );
        Ok(())
    }

    #[test]
    fn remove_shifts_following_items() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        for name in ["C", "B", "A"] {
            store.add(name)?;
        }
        let removed = store.remove_at(0)?;
        assert_eq!(removed.name, "A");
        assert_eq!(names(&store), vec!["B", "C"]);
        Ok(())
    }

    #[test]
    fn clear_persists_empty_array() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("a")?;
        store.add("b")?;
        assert_eq!(store.clear()?, 2);
        assert!(store.is_empty());
        assert_eq!(store.backend().raw(DEFAULT_KEY), Some("[]"));
        Ok(())
    }

    #[test]
    fn out_of_range_index_changes_nothing() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("only")?;
        assert_matches!(
            store.set_status(3, true),
            Err(ListError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_matches!(
            store.remove_at(1),
            Err(ListError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(store.get(0).map(|item| item.status), Some(Status::Pending));
        assert_mirrored(&store);
        Ok(())
    }

    #[test]
    fn missing_key_loads_empty() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let store = ListStore::load_with_key(FileStore::open(temp.path())?, "elsewhere");
        assert!(store.is_empty());
        assert_eq!(store.key(), "elsewhere");
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_loads_empty() {
        let store = ListStore::load(MemoryStore::with_entry(DEFAULT_KEY, "{not json"));
        assert!(store.is_empty());

        let store = ListStore::load(MemoryStore::with_entry(
            DEFAULT_KEY,
            r#"[{"name":"x","status":"archived"}]"#,
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_write_restores_previous_list() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        store.add("a")?;
        store.backend_mut().set_read_only(true);

        assert_matches!(store.add("b"), Err(ListError::Persist(_)));
        assert_matches!(store.set_status(0, true), Err(ListError::Persist(_)));
        assert_matches!(store.clear(), Err(ListError::Persist(_)));
        assert_eq!(names(&store), vec!["a"]);
        assert_eq!(store.get(0).map(|item| item.status), Some(Status::Pending));
        assert_mirrored(&store);
        Ok(())
    }

    #[test]
    fn ids_resolve_to_current_positions() -> anyhow::Result<()> {
        let mut store = ListStore::load(MemoryStore::new());
        let c = store.add("C")?.expect("id");
        let b = store.add("B")?.expect("id");
        let a = store.add("A")?.expect("id");

        store.remove_by_id(a)?;
        assert_eq!(store.position_of(b), Some(0));
        assert_eq!(store.position_of(c), Some(1));

        assert_eq!(store.toggle_by_id(c)?, Status::Completed);
        assert_eq!(store.get(1).map(|item| item.status), Some(Status::Completed));
        assert_matches!(store.remove_by_id(a), Err(ListError::UnknownItem(_)));
        assert_eq!(store.completed_count(), 1);
        assert_eq!(store.pending_count(), 1);
        Ok(())
    }
}
