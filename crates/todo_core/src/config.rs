//! Storage configuration resolved from the process environment.
//!
//! # Responsibility
//! - Choose the storage strategy and storage location.
//! - Resolve the log level used by `init_logging`.
//!
//! # Invariants
//! - `USE_DATABASE` unset selects the JSON file store; any value other than
//!   `false` selects SQLite.
//! - Resolution never touches the file system.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const USE_DATABASE_ENV: &str = "USE_DATABASE";
pub const DATA_DIR_ENV: &str = "TODO_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "TODO_LOG_LEVEL";

const DEFAULT_DATA_DIR: &str = "data";
const SQLITE_FILE_NAME: &str = "todo.sqlite3";
const JSON_FILE_NAME: &str = "data.json";

/// Persistence strategy backing the item repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Targeted single-row statements against SQLite.
    Sqlite,
    /// Whole-collection JSON payload rewritten on each mutation.
    JsonFile,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::JsonFile => "json_file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(key) => write!(f, "environment variable {key} is set but empty"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved storage settings for one application session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub log_level: &'static str,
}

impl StoreConfig {
    /// Builds a config for an explicit backend and directory.
    pub fn new(backend: StorageBackend, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            data_dir: data_dir.into(),
            log_level: default_log_level(),
        }
    }

    /// Reads `USE_DATABASE`, `TODO_DATA_DIR` and `TODO_LOG_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend = match lookup(USE_DATABASE_ENV) {
            Some(value) if value.trim() != "false" => StorageBackend::Sqlite,
            _ => StorageBackend::JsonFile,
        };

        let data_dir = match lookup(DATA_DIR_ENV) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyValue(DATA_DIR_ENV));
            }
            Some(value) => PathBuf::from(value.trim()),
            None => PathBuf::from(DEFAULT_DATA_DIR),
        };

        let log_level = match lookup(LOG_LEVEL_ENV) {
            Some(value) => normalize_level(&value).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        Ok(Self {
            backend,
            data_dir,
            log_level,
        })
    }

    /// File that holds the collection for the selected backend.
    pub fn storage_path(&self) -> PathBuf {
        let file_name = match self.backend {
            StorageBackend::Sqlite => SQLITE_FILE_NAME,
            StorageBackend::JsonFile => JSON_FILE_NAME,
        };
        self.data_dir.join(file_name)
    }

    /// Directory for rolling log files, next to the data.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
