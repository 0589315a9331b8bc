//! Core todo list logic: item persistence and in-memory reconciliation.
//! This crate is the single source of truth for item invariants; UI layers
//! only read `TodoService` state and call its mutation methods.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, StorageBackend, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Item, ItemId, ItemPatch, ItemValidationError};
pub use repo::blob_repo::{BlobItemRepository, BlobStore, FileBlobStore, MemoryBlobStore};
pub use repo::item_repo::{ItemRepository, RepoError, RepoResult, SqliteItemRepository};
pub use service::todo_service::{TodoError, TodoService};
pub use store::StoreHandle;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
