use rusqlite::Connection;
use todo_core::db::schema::schema_version;
use todo_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_creates_items_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(user_version(&conn), schema_version());
    assert_table_exists(&conn, "items");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO items (id, text, createdAt) VALUES ('x', 'kept', '2024-01-01T00:00:00Z');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(user_version(&conn_second), schema_version());
    let count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, schema_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn optional_columns_are_nullable() {
    let conn = open_db_in_memory().unwrap();
    let nullable: Vec<(String, i64)> = {
        let mut stmt = conn.prepare("PRAGMA table_info(items);").unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(3)?)))
            .unwrap();
        rows.map(Result::unwrap).collect()
    };

    for (column, not_null) in nullable {
        let expected = matches!(column.as_str(), "id" | "text" | "createdAt");
        assert_eq!(not_null == 1, expected, "column {column}");
    }
}

fn user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
