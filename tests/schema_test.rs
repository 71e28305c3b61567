//! Integration tests for schema introspection on hand-built SQLite files.

use manufacturing_mcp_server::db::{ConnectionResolver, ResolverSettings, SchemaInspector};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use tempfile::TempDir;

async fn build_database(path: &Path, statements: &[&str]) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    for sql in statements {
        sqlx::query(sql).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_undescribable_table_is_skipped_with_reason() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plant.db");

    // A virtual table whose module is not available: listed in the catalog,
    // but any attempt to read its columns fails.
    build_database(
        &path,
        &[
            "CREATE TABLE factories (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            "CREATE TABLE machines (id INTEGER PRIMARY KEY, factory_id INTEGER REFERENCES factories(id))",
            "PRAGMA writable_schema = ON",
            "INSERT INTO sqlite_master (type, name, tbl_name, rootpage, sql) \
             VALUES ('table', 'sensor_feed', 'sensor_feed', 0, \
             'CREATE VIRTUAL TABLE sensor_feed USING plant_telemetry(reading)')",
            "PRAGMA writable_schema = OFF",
        ],
    )
    .await;

    let resolver = ConnectionResolver::new(
        Some(format!("sqlite:{}", path.display())),
        dir.path().join("manufacturing.db"),
        ResolverSettings::default(),
    );
    let handle = resolver.resolve().await.unwrap();
    let schema = SchemaInspector::describe(&handle).await.unwrap();

    assert_eq!(schema.table_count, 2);
    assert!(schema.tables.contains_key("factories"));
    let machines = &schema.tables["machines"];
    assert_eq!(machines.foreign_keys.len(), 1);

    assert_eq!(schema.skipped.len(), 1);
    assert_eq!(schema.skipped[0].table, "sensor_feed");
    assert!(!schema.skipped[0].reason.is_empty());
    assert!(!schema.tables.contains_key("sensor_feed"));
}

#[tokio::test]
async fn test_empty_database_has_no_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.db");
    build_database(&path, &["PRAGMA user_version = 1"]).await;

    let resolver = ConnectionResolver::new(
        Some(format!("sqlite:{}", path.display())),
        dir.path().join("manufacturing.db"),
        ResolverSettings::default(),
    );
    let handle = resolver.resolve().await.unwrap();
    let schema = SchemaInspector::describe(&handle).await.unwrap();

    assert_eq!(schema.table_count, 0);
    assert!(schema.skipped.is_empty());
}
