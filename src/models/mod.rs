//! Data models for the manufacturing MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionTarget, DatabaseType, mask_connection_string};
pub use query::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryParam, QueryRequest,
    QueryResult,
};
pub use schema::{ColumnDefinition, ForeignKey, SchemaDescription, SkippedTable, TableSchema};
