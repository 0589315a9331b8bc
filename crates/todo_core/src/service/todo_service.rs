//! Todo list reconciliation service.
//!
//! # Responsibility
//! - Own the authoritative in-memory item list shown by the presentation layer.
//! - Apply every mutation to the repository first and mirror it in memory only
//!   after the repository confirms success.
//! - Expose failures as data (`last_error`) instead of returning errors.
//!
//! # Invariants
//! - Each operation clears `last_error` before it starts.
//! - A failed operation leaves `items` exactly as it was.
//! - `items` keeps load/append order and is never re-sorted.
//! - The repository is read only by `initialize`, never mid-session.

use crate::model::item::{current_timestamp, Item, ItemId, ItemPatch, ItemValidationError};
use crate::repo::item_repo::{ItemRepository, RepoError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// User-facing failure recorded by the service.
#[derive(Debug)]
pub enum TodoError {
    /// Input rejected locally; the repository was not called.
    Validation(ItemValidationError),
    /// The repository reported a failure.
    Storage(RepoError),
}

impl Display for TodoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid input: {err}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl Error for TodoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<ItemValidationError> for TodoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TodoError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

/// Owned list state synchronized with an item repository.
pub struct TodoService<R: ItemRepository> {
    repo: R,
    items: Vec<Item>,
    last_error: Option<TodoError>,
    pending_text: String,
}

impl<R: ItemRepository> TodoService<R> {
    /// Creates an empty service. Call `initialize` to load stored items.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            items: Vec::new(),
            last_error: None,
            pending_text: String::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn last_error(&self) -> Option<&TodoError> {
        self.last_error.as_ref()
    }

    /// Returns the last failure rendered as a display message.
    pub fn last_error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(ToString::to_string)
    }

    /// Text currently typed into the add-item input.
    pub fn pending_text(&self) -> &str {
        &self.pending_text
    }

    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_text = text.into();
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Consumes the service and hands the repository back for shutdown.
    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Replaces `items` with the stored collection.
    ///
    /// On failure the previous list is kept and `last_error` is set.
    pub fn initialize(&mut self) -> bool {
        self.last_error = None;
        match self.repo.load_all() {
            Ok(items) => {
                info!(
                    "event=todo_load module=service status=ok count={}",
                    items.len()
                );
                self.items = items;
                true
            }
            Err(err) => self.fail("todo_load", err.into()),
        }
    }

    /// Adds a new item and returns its id.
    ///
    /// Blank text is rejected without touching the repository. On success the
    /// pending input text is cleared.
    pub fn add_item(&mut self, text: &str) -> Option<ItemId> {
        self.last_error = None;
        let item = match Item::new(text) {
            Ok(item) => item,
            Err(err) => {
                self.fail("todo_add", err.into());
                return None;
            }
        };

        if let Err(err) = self.repo.create_item(&item) {
            self.fail("todo_add", err.into());
            return None;
        }

        let id = item.id;
        self.items.push(item);
        self.pending_text.clear();
        info!("event=todo_add module=service status=ok item_id={id}");
        Some(id)
    }

    /// Adds an item from the pending input text.
    pub fn add_pending(&mut self) -> Option<ItemId> {
        let text = self.pending_text.clone();
        self.add_item(&text)
    }

    /// Replaces the text of one item.
    pub fn rename_item(&mut self, id: ItemId, text: &str) -> bool {
        self.last_error = None;
        let patch = match ItemPatch::rename(text) {
            Ok(patch) => patch,
            Err(err) => return self.fail("todo_rename", err.into()),
        };
        self.commit_patch("todo_rename", id, patch)
    }

    /// Flips completion: open items are stamped with now, completed items are
    /// reopened. Unknown ids are ignored. Completing an item whose creation
    /// time is still ahead of the clock is a validation failure.
    pub fn toggle_complete(&mut self, id: ItemId) -> bool {
        self.last_error = None;
        let Some(item) = self.item(id) else {
            return false;
        };

        let completed_at = if item.is_completed() {
            None
        } else {
            let now = current_timestamp();
            if now < item.created_at {
                return self.fail(
                    "todo_toggle",
                    ItemValidationError::CompletedBeforeCreated.into(),
                );
            }
            Some(now)
        };
        self.commit_patch("todo_toggle", id, ItemPatch::completion(completed_at))
    }

    /// Sets (`Some`) or clears (`None`) the reminder of one item.
    pub fn set_reminder(&mut self, id: ItemId, reminder_at: Option<DateTime<Utc>>) -> bool {
        self.last_error = None;
        self.commit_patch("todo_reminder", id, ItemPatch::reminder(reminder_at))
    }

    /// Deletes one item. Removing an id that is already gone succeeds.
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        self.last_error = None;
        if let Err(err) = self.repo.delete_item(id) {
            return self.fail("todo_remove", err.into());
        }

        self.items.retain(|item| item.id != id);
        info!("event=todo_remove module=service status=ok item_id={id}");
        true
    }

    fn commit_patch(&mut self, event: &'static str, id: ItemId, patch: ItemPatch) -> bool {
        if let Err(err) = self.repo.update_item(id, &patch) {
            return self.fail(event, err.into());
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.apply_patch(&patch);
        }
        info!("event={event} module=service status=ok item_id={id}");
        true
    }

    fn fail(&mut self, event: &'static str, err: TodoError) -> bool {
        let error_code = match &err {
            TodoError::Validation(_) => "validation_failed",
            TodoError::Storage(_) => "storage_failed",
        };
        warn!("event={event} module=service status=error error_code={error_code} error={err}");
        self.last_error = Some(err);
        false
    }
}
