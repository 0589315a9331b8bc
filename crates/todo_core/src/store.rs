//! Session-scoped storage handle.
//!
//! # Responsibility
//! - Open the configured backend once per application session.
//! - Lend item repositories that borrow the open handle.
//! - Release the backend deterministically on shutdown.
//!
//! # Invariants
//! - The handle is owned by the caller; nothing is opened lazily or globally.
//! - Repositories cannot outlive the handle they borrow from.

use crate::config::{StorageBackend, StoreConfig};
use crate::db::open_db;
use crate::repo::blob_repo::{BlobItemRepository, FileBlobStore};
use crate::repo::item_repo::{ItemRepository, RepoResult, SqliteItemRepository};
use log::{error, info};
use rusqlite::Connection;
use std::fs;

/// Open storage backend for one application session.
pub enum StoreHandle {
    Sqlite(Connection),
    JsonFile(FileBlobStore),
}

impl StoreHandle {
    /// Opens the backend selected by `config`.
    ///
    /// # Side effects
    /// - Creates `config.data_dir` for the SQLite backend.
    /// - The JSON file is only created by the first successful save.
    pub fn open(config: &StoreConfig) -> RepoResult<Self> {
        let handle = match config.backend {
            StorageBackend::Sqlite => {
                fs::create_dir_all(config.data_dir())?;
                Self::Sqlite(open_db(config.storage_path())?)
            }
            StorageBackend::JsonFile => Self::JsonFile(FileBlobStore::new(config.storage_path())),
        };
        info!(
            "event=store_open module=store status=ok backend={}",
            config.backend.as_str()
        );
        Ok(handle)
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::Sqlite(_) => StorageBackend::Sqlite,
            Self::JsonFile(_) => StorageBackend::JsonFile,
        }
    }

    /// Returns a repository borrowing this handle.
    pub fn repository(&self) -> RepoResult<Box<dyn ItemRepository + '_>> {
        match self {
            Self::Sqlite(conn) => Ok(Box::new(SqliteItemRepository::try_new(conn)?)),
            Self::JsonFile(store) => Ok(Box::new(BlobItemRepository::new(store))),
        }
    }

    /// Releases the backend and reports close failures.
    pub fn close(self) -> RepoResult<()> {
        let backend = self.backend();
        let result: RepoResult<()> = match self {
            Self::Sqlite(conn) => conn.close().map_err(|(_, err)| err.into()),
            Self::JsonFile(_) => Ok(()),
        };
        match &result {
            Ok(()) => info!(
                "event=store_close module=store status=ok backend={}",
                backend.as_str()
            ),
            Err(err) => error!(
                "event=store_close module=store status=error backend={} error={}",
                backend.as_str(),
                err
            ),
        }
        result
    }
}
