//! Item repository contract and SQLite row implementation.
//!
//! # Responsibility
//! - Define the four-operation persistence contract every store honors.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate items/patches before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Absent timestamps are stored as SQL `NULL`, never as empty text.
//! - Deleting a missing id succeeds; updating a missing id fails.

use crate::db::schema::{current_user_version, schema_version};
use crate::db::DbError;
use crate::model::item::{
    format_timestamp, parse_timestamp, Item, ItemId, ItemPatch, ItemValidationError,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    text,
    createdAt,
    completedAt,
    reminderAt,
    deadlineAt
FROM items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence.
///
/// Every variant except `Validation` is a storage failure from the caller's
/// point of view.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    Io(std::io::Error),
    NotFound(ItemId),
    DuplicateId(ItemId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl RepoError {
    /// Returns whether the failure came from the durable store.
    pub fn is_storage(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o failed: {err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::DuplicateId(id) => write!(f, "item already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema is not initialized: expected version {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Durable CRUD contract for the item collection.
///
/// Implementations perform I/O only; they never see or mutate the caller's
/// in-memory list.
pub trait ItemRepository {
    /// Returns every stored item in stored order.
    fn load_all(&self) -> RepoResult<Vec<Item>>;
    /// Persists a fully-populated new item.
    fn create_item(&self, item: &Item) -> RepoResult<()>;
    /// Persists only the fields present in `patch`.
    fn update_item(&self, id: ItemId, patch: &ItemPatch) -> RepoResult<()>;
    /// Removes the item; a missing id is not an error.
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
}

impl<R: ItemRepository + ?Sized> ItemRepository for &R {
    fn load_all(&self) -> RepoResult<Vec<Item>> {
        (**self).load_all()
    }

    fn create_item(&self, item: &Item) -> RepoResult<()> {
        (**self).create_item(item)
    }

    fn update_item(&self, id: ItemId, patch: &ItemPatch) -> RepoResult<()> {
        (**self).update_item(id, patch)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        (**self).delete_item(id)
    }
}

impl<R: ItemRepository + ?Sized> ItemRepository for Box<R> {
    fn load_all(&self) -> RepoResult<Vec<Item>> {
        (**self).load_all()
    }

    fn create_item(&self, item: &Item) -> RepoResult<()> {
        (**self).create_item(item)
    }

    fn update_item(&self, id: ItemId, patch: &ItemPatch) -> RepoResult<()> {
        (**self).update_item(id, patch)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        (**self).delete_item(id)
    }
}

/// SQLite-backed item repository using targeted single-row statements.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a bootstrapped connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` does not match.
    /// - `MissingRequiredTable` when the `items` table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = schema_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_items: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'items'
            );",
            [],
            |row| row.get(0),
        )?;
        if has_items == 0 {
            return Err(RepoError::MissingRequiredTable("items"));
        }

        Ok(Self { conn })
    }

    /// Rejects a completion stamp earlier than the stored `createdAt`.
    fn ensure_completion_after_creation(
        &self,
        id: ItemId,
        completed_at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let created_text: String = self
            .conn
            .query_row(
                "SELECT createdAt FROM items WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound(id))?;
        let created_at = parse_timestamp(&created_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{created_text}` in items.createdAt"
            ))
        })?;

        if completed_at < created_at {
            return Err(ItemValidationError::CompletedBeforeCreated.into());
        }
        Ok(())
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn load_all(&self) -> RepoResult<Vec<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        Ok(items)
    }

    fn create_item(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;

        let result = self.conn.execute(
            "INSERT INTO items (
                id,
                text,
                createdAt,
                completedAt,
                reminderAt,
                deadlineAt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.id.to_string(),
                item.text.as_str(),
                format_timestamp(&item.created_at),
                item.completed_at.as_ref().map(format_timestamp),
                item.reminder_at.as_ref().map(format_timestamp),
                item.deadline_at.as_ref().map(format_timestamp),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(RepoError::DuplicateId(item.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_item(&self, id: ItemId, patch: &ItemPatch) -> RepoResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }
        if let Some(Some(completed_at)) = patch.completed_at {
            self.ensure_completion_after_creation(id, completed_at)?;
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(text) = &patch.text {
            assignments.push("text = ?");
            bind_values.push(Value::Text(text.clone()));
        }
        if let Some(completed_at) = patch.completed_at {
            assignments.push("completedAt = ?");
            bind_values.push(optional_timestamp_value(completed_at));
        }
        if let Some(reminder_at) = patch.reminder_at {
            assignments.push("reminderAt = ?");
            bind_values.push(optional_timestamp_value(reminder_at));
        }
        bind_values.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE items SET {} WHERE id = ?;", assignments.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])?;
        Ok(())
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid id value `{id_text}` in items.id"))
    })?;

    let created_text: String = row.get("createdAt")?;
    let created_at = parse_timestamp(&created_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{created_text}` in items.createdAt"
        ))
    })?;

    let item = Item {
        id,
        text: row.get("text")?,
        created_at,
        completed_at: parse_optional_timestamp(row, "completedAt")?,
        reminder_at: parse_optional_timestamp(row, "reminderAt")?,
        deadline_at: parse_optional_timestamp(row, "deadlineAt")?,
    };
    item.validate().map_err(|err| {
        RepoError::InvalidData(format!("item {id} violates invariants: {err}"))
    })?;
    Ok(item)
}

fn parse_optional_timestamp(
    row: &Row<'_>,
    column: &'static str,
) -> RepoResult<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(column)? {
        Some(value) => parse_timestamp(&value).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid timestamp `{value}` in items.{column}"))
        }),
        None => Ok(None),
    }
}

fn optional_timestamp_value(value: Option<DateTime<Utc>>) -> Value {
    match value {
        Some(timestamp) => Value::Text(format_timestamp(&timestamp)),
        None => Value::Null,
    }
}
