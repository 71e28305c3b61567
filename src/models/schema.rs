//! Schema-related data models.
//!
//! This module defines the normalized description produced by introspection.
//! Every table entry carries the same fields regardless of driver family.

use crate::models::DatabaseType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type as reported by the catalog (e.g. "INTEGER", "varchar")
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            primary_key: false,
        }
    }

    /// Mark this column as part of the primary key.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.primary_key = is_pk;
        self
    }
}

/// One (column) → (referenced table, referenced column) edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TableSchema {
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDefinition>, foreign_keys: Vec<ForeignKey>) -> Self {
        Self {
            columns,
            foreign_keys,
        }
    }

    /// Names of the primary-key columns.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// A table omitted from the description and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDescription {
    pub database_type: DatabaseType,
    pub table_count: usize,
    pub tables: BTreeMap<String, TableSchema>,
    pub skipped: Vec<SkippedTable>,
}

impl SchemaDescription {
    pub fn new(
        database_type: DatabaseType,
        tables: BTreeMap<String, TableSchema>,
        skipped: Vec<SkippedTable>,
    ) -> Self {
        Self {
            database_type,
            table_count: tables.len(),
            tables,
            skipped,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_serializes_type_field() {
        let col = ColumnDefinition::new("id", "INTEGER", false).with_primary_key(true);
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "INTEGER");
        assert_eq!(json["primary_key"], true);
        assert_eq!(json["nullable"], false);
    }

    #[test]
    fn test_table_primary_key() {
        let table = TableSchema::new(
            vec![
                ColumnDefinition::new("id", "INTEGER", false).with_primary_key(true),
                ColumnDefinition::new("name", "TEXT", false),
            ],
            vec![],
        );
        assert_eq!(table.primary_key(), vec!["id"]);
    }

    #[test]
    fn test_description_counts_tables() {
        let mut tables = BTreeMap::new();
        tables.insert("factories".to_string(), TableSchema::default());
        let desc = SchemaDescription::new(
            DatabaseType::SQLite,
            tables,
            vec![SkippedTable {
                table: "broken".into(),
                reason: "no such table".into(),
            }],
        );
        assert_eq!(desc.table_count, 1);
        assert!(desc.table("factories").is_some());
        let json = serde_json::to_value(&desc).unwrap();
        assert_eq!(json["database_type"], "sqlite");
        assert_eq!(json["skipped"][0]["table"], "broken");
    }
}
