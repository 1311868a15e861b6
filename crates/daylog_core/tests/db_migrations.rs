use daylog_core::db::migrations::{apply_migrations, latest_version};
use daylog_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["users", "daily_logs", "hour_blocks", "todos", "backlog_items"] {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daylog.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "daily_logs");
    let journal_mode: String = conn_second
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_duplicate_day_and_hour_rows() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO users (id, timezone) VALUES ('u1', 'UTC');
         INSERT INTO daily_logs (id, user_id, date, status) VALUES ('d1', 'u1', '2026-10-17', 'execution');
         INSERT INTO hour_blocks (id, daily_log_id, hour) VALUES ('b1', 'd1', 9);",
    )
    .unwrap();

    assert!(conn
        .execute(
            "INSERT INTO daily_logs (id, user_id, date, status) VALUES ('d2', 'u1', '2026-10-17', 'execution');",
            [],
        )
        .is_err());
    assert!(conn
        .execute(
            "INSERT INTO hour_blocks (id, daily_log_id, hour) VALUES ('b2', 'd1', 9);",
            [],
        )
        .is_err());
}

#[test]
fn schema_rejects_swept_day_that_is_not_closed() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("INSERT INTO users (id, timezone) VALUES ('u1', 'UTC');")
        .unwrap();
    let result = conn.execute(
        "INSERT INTO daily_logs (id, user_id, date, status, is_locked, swept_at)
         VALUES ('d1', 'u1', '2026-10-16', 'history', 0, 1);",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    daylog_core::db::schema_version(conn).unwrap()
}

#[test]
fn failing_schema_step_is_named_and_rolled_back() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE users (legacy TEXT);").unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert!(matches!(err, DbError::Migration { version: 1, .. }), "{err}");
    assert_eq!(schema_version(&conn), 0);
    let days_table: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE name = 'daily_logs';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(days_table, 0);
}

#[test]
fn applying_migrations_twice_reports_starting_version() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    assert_eq!(apply_migrations(&mut conn).unwrap(), latest_version());
    assert_eq!(schema_version(&conn), latest_version());
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
