//! Item table bootstrap.
//!
//! # Invariants
//! - There is exactly one schema version; databases stamped with a newer
//!   version are refused instead of being read.
//! - Bootstrap runs in one transaction together with the version stamp.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const SCHEMA_VERSION: u32 = 1;
const INIT_SQL: &str = include_str!("init.sql");

/// Returns the schema version written by this binary.
pub fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Creates the `items` table when missing and stamps `user_version`.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;

    if current_version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: SCHEMA_VERSION,
        });
    }

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(INIT_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;

    Ok(())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
