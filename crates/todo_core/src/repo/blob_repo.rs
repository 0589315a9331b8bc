//! Whole-collection blob persistence.
//!
//! # Responsibility
//! - Transport the entire item list as one serialized JSON payload through a
//!   load/save pair.
//! - Implement `ItemRepository` by rewriting the whole payload on mutation.
//!
//! # Invariants
//! - A save either replaces the previous payload completely or leaves it as-is.
//! - A store that has never been saved to loads as an empty collection.
//! - Loaded payloads must decode to valid items with unique ids.

use crate::model::item::{Item, ItemId, ItemPatch};
use crate::repo::item_repo::{ItemRepository, RepoError, RepoResult};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Opaque load/save pair for a serialized item collection.
pub trait BlobStore {
    /// Returns the last saved payload, or `None` when nothing was saved yet.
    fn load(&self) -> RepoResult<Option<String>>;
    /// Replaces the stored payload.
    fn save(&self, payload: &str) -> RepoResult<()>;
}

impl<S: BlobStore + ?Sized> BlobStore for &S {
    fn load(&self) -> RepoResult<Option<String>> {
        (**self).load()
    }

    fn save(&self, payload: &str) -> RepoResult<()> {
        (**self).save(payload)
    }
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self) -> RepoResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, payload: &str) -> RepoResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write-then-rename keeps the old payload intact if the write fails.
        let staging = self.staging_path();
        if let Err(err) = fs::write(&staging, payload) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }
}

/// In-process blob, the equivalent of a host bridge holding the payload.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    payload: RefCell<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a raw payload, valid or not.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: RefCell::new(Some(payload.into())),
        }
    }

    /// Returns a copy of the current raw payload.
    pub fn payload(&self) -> Option<String> {
        self.payload.borrow().clone()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self) -> RepoResult<Option<String>> {
        Ok(self.payload.borrow().clone())
    }

    fn save(&self, payload: &str) -> RepoResult<()> {
        *self.payload.borrow_mut() = Some(payload.to_string());
        Ok(())
    }
}

/// Item repository that rewrites the whole collection on every mutation.
pub struct BlobItemRepository<S: BlobStore> {
    store: S,
}

impl<S: BlobStore> BlobItemRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn read_items(&self) -> RepoResult<Vec<Item>> {
        match self.store.load()? {
            Some(payload) => decode_items(&payload),
            None => Ok(Vec::new()),
        }
    }

    fn write_items(&self, items: &[Item]) -> RepoResult<()> {
        let payload = serde_json::to_string(items)
            .map_err(|err| RepoError::InvalidData(format!("failed to encode items: {err}")))?;
        self.store.save(&payload)
    }
}

impl<S: BlobStore> ItemRepository for BlobItemRepository<S> {
    fn load_all(&self) -> RepoResult<Vec<Item>> {
        self.read_items()
    }

    fn create_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let mut items = self.read_items()?;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(RepoError::DuplicateId(item.id));
        }
        items.push(item.clone());
        self.write_items(&items)
    }

    fn update_item(&self, id: ItemId, patch: &ItemPatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        let mut items = self.read_items()?;
        let target = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(RepoError::NotFound(id))?;
        target.apply_patch(patch);
        target.validate()?;
        self.write_items(&items)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let mut items = self.read_items()?;
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Ok(());
        }
        self.write_items(&items)
    }
}

/// Decodes a JSON array payload into validated items.
pub fn decode_items(payload: &str) -> RepoResult<Vec<Item>> {
    let items: Vec<Item> = serde_json::from_str(payload)
        .map_err(|err| RepoError::InvalidData(format!("malformed item payload: {err}")))?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in &items {
        item.validate().map_err(|err| {
            RepoError::InvalidData(format!("item {} violates invariants: {err}", item.id))
        })?;
        if !seen.insert(item.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate item id {} in payload",
                item.id
            )));
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::{decode_items, BlobItemRepository, BlobStore, MemoryBlobStore};
    use crate::model::item::Item;
    use crate::repo::item_repo::{ItemRepository, RepoError};

    #[test]
    fn unsaved_store_loads_as_empty_collection() {
        let repo = BlobItemRepository::new(MemoryBlobStore::new());
        assert!(repo.load_all().unwrap().is_empty());
    }

    #[test]
    fn decode_accepts_null_and_missing_optional_fields() {
        let payload = r#"[
            {"id":"00000000-0000-4000-8000-000000000001","text":"a","createdAt":"2024-01-01T00:00:00.000Z","completedAt":null},
            {"id":"00000000-0000-4000-8000-000000000002","text":"b","createdAt":"2024-01-01T00:00:00Z","reminderAt":"2024-02-01T08:30:00.000Z"}
        ]"#;
        let items = decode_items(payload).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].completed_at.is_none());
        assert!(items[0].reminder_at.is_none());
        assert!(items[1].reminder_at.is_some());
    }

    #[test]
    fn decode_rejects_duplicate_ids() {
        let payload = r#"[
            {"id":"00000000-0000-4000-8000-000000000001","text":"a","createdAt":"2024-01-01T00:00:00Z"},
            {"id":"00000000-0000-4000-8000-000000000001","text":"b","createdAt":"2024-01-01T00:00:00Z"}
        ]"#;
        assert!(matches!(decode_items(payload), Err(RepoError::InvalidData(_))));
    }

    #[test]
    fn delete_of_missing_id_does_not_write() {
        let store = MemoryBlobStore::new();
        let repo = BlobItemRepository::new(&store);
        repo.delete_item(Item::new("ghost").unwrap().id).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn absent_fields_are_omitted_from_payload() {
        let store = MemoryBlobStore::new();
        let repo = BlobItemRepository::new(&store);
        repo.create_item(&Item::new("plain").unwrap()).unwrap();

        let payload = store.payload().unwrap();
        assert!(payload.contains("\"createdAt\""));
        assert!(!payload.contains("completedAt"));
        assert!(!payload.contains("reminderAt"));
    }
}
