//! Schema introspection.
//!
//! Reads catalog metadata for every user table visible to the connection and
//! normalizes it into a `SchemaDescription`. A table whose metadata cannot be
//! read is left out and listed in `skipped`; only a failure to list tables at
//! all fails the call.

use crate::db::pool::{DbHandle, DbPool};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, ForeignKey, SchemaDescription, SkippedTable, TableSchema};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Schema inspector for the connected database.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Describe every user table. Produced fresh on each call.
    pub async fn describe(handle: &DbHandle) -> DbResult<SchemaDescription> {
        let names = match handle.pool() {
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
        .map_err(|e| DbError::introspection(format!("Cannot list tables: {}", e)))?;

        debug!(count = names.len(), "Describing tables");

        let mut tables = BTreeMap::new();
        let mut skipped = Vec::new();
        for name in names {
            let result = match handle.pool() {
                DbPool::MySql(p) => mysql::describe_table(p, &name).await,
                DbPool::Postgres(p) => postgres::describe_table(p, &name).await,
                DbPool::SQLite(p) => sqlite::describe_table(p, &name).await,
            };

            match result {
                Ok(table) if table.columns.is_empty() => {
                    skipped.push(SkippedTable {
                        table: name,
                        reason: "no readable columns".to_string(),
                    });
                }
                Ok(table) => {
                    tables.insert(name, table);
                }
                Err(e) => {
                    warn!(table = %name, error = %e, "Skipping table");
                    skipped.push(SkippedTable {
                        table: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(SchemaDescription::new(handle.db_type(), tables, skipped))
    }
}

/// Quote an identifier for embedding in SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// =============================================================================
// SQL Query Constants
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            (c.is_nullable = 'YES') AS is_nullable,
            EXISTS (
                SELECT 1
                FROM information_schema.table_constraints tc
                JOIN information_schema.key_column_usage kcu
                    ON tc.constraint_name = kcu.constraint_name
                    AND tc.table_schema = kcu.table_schema
                    AND tc.table_name = kcu.table_name
                WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = c.table_schema
                AND tc.table_name = c.table_name
                AND kcu.column_name = c.column_name
            ) AS is_primary_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        WHERE c.table_name = $1 AND c.table_schema = current_schema()
        ORDER BY c.ordinal_position
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.column_name::text AS column_name,
            ccu.table_name::text AS foreign_table_name,
            ccu.column_name::text AS foreign_column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage ccu
            ON ccu.constraint_name = tc.constraint_name
            AND ccu.table_schema = tc.table_schema
        WHERE tc.table_name = $1
        AND tc.table_schema = current_schema()
        AND tc.constraint_type = 'FOREIGN KEY'
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_NAME = ?
        AND TABLE_SCHEMA = DATABASE()
        AND REFERENCED_TABLE_NAME IS NOT NULL
        "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(DbError::from))
            .collect()
    }

    pub async fn describe_table(pool: &PgPool, table_name: &str) -> DbResult<TableSchema> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("column_name")?;
            let column_type: String = row.try_get("column_type")?;
            let nullable: bool = row.try_get("is_nullable")?;
            let is_pk: bool = row.try_get("is_primary_key")?;
            columns.push(ColumnDefinition::new(name, column_type, nullable).with_primary_key(is_pk));
        }

        let rows = sqlx::query(queries::postgres::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get("column_name")?;
            let ref_table: String = row.try_get("foreign_table_name")?;
            let ref_column: String = row.try_get("foreign_column_name")?;
            foreign_keys.push(ForeignKey::new(column, ref_table, ref_column));
        }

        Ok(TableSchema::new(columns, foreign_keys))
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    ///
    /// information_schema columns may come back as VARBINARY depending on the
    /// server version, so fall back to decoding bytes.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    pub async fn list_tables(pool: &MySqlPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub async fn describe_table(pool: &MySqlPool, table_name: &str) -> DbResult<TableSchema> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME");
                let column_type = get_string(row, "COLUMN_TYPE");
                let nullable = get_string(row, "IS_NULLABLE");
                let is_pk = get_string(row, "COLUMN_KEY") == "PRI";
                ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk)
            })
            .collect();

        let rows = sqlx::query(queries::mysql::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;

        let foreign_keys = rows
            .iter()
            .map(|row| {
                ForeignKey::new(
                    get_string(row, "COLUMN_NAME"),
                    get_string(row, "REFERENCED_TABLE_NAME"),
                    get_string(row, "REFERENCED_COLUMN_NAME"),
                )
            })
            .collect();

        Ok(TableSchema::new(columns, foreign_keys))
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_tables(pool: &SqlitePool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(DbError::from))
            .collect()
    }

    async fn fetch_columns(pool: &SqlitePool, table_name: &str) -> DbResult<Vec<ColumnDefinition>> {
        let pragma_query = format!("PRAGMA table_info({})", quote_identifier(table_name));
        let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            // Columns declared without a type report an empty string
            let data_type: String = row.try_get::<Option<String>, _>("type")?.unwrap_or_default();
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;
            columns.push(ColumnDefinition::new(name, data_type, notnull == 0).with_primary_key(pk > 0));
        }
        Ok(columns)
    }

    pub async fn describe_table(pool: &SqlitePool, table_name: &str) -> DbResult<TableSchema> {
        let columns = fetch_columns(pool, table_name).await?;

        let fk_query = format!("PRAGMA foreign_key_list({})", quote_identifier(table_name));
        let rows = sqlx::query(&fk_query).fetch_all(pool).await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.try_get("from")?;
            let ref_table: String = row.try_get("table")?;
            // NULL when the reference targets the primary key implicitly
            let ref_column = match row.try_get::<Option<String>, _>("to")? {
                Some(col) => col,
                None => fetch_columns(pool, &ref_table)
                    .await?
                    .into_iter()
                    .find(|c| c.primary_key)
                    .map(|c| c.name)
                    .unwrap_or_else(|| "rowid".to_string()),
            };
            foreign_keys.push(ForeignKey::new(column, ref_table, ref_column));
        }

        Ok(TableSchema::new(columns, foreign_keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("machines"), "\"machines\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
