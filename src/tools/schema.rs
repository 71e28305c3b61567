//! Schema tool.
//!
//! This module implements the `get_schema` MCP tool.

use crate::db::{ConnectionResolver, SchemaInspector};
use crate::error::DbResult;
use crate::models::SchemaDescription;
use std::sync::Arc;
use tracing::{info, warn};

/// Handler for the get_schema tool.
pub struct SchemaToolHandler {
    resolver: Arc<ConnectionResolver>,
}

impl SchemaToolHandler {
    pub fn new(resolver: Arc<ConnectionResolver>) -> Self {
        Self { resolver }
    }

    /// Describe every table in the connected database.
    pub async fn get_schema(&self) -> DbResult<SchemaDescription> {
        let handle = self.resolver.resolve().await?;
        let schema = SchemaInspector::describe(&handle).await?;

        if !schema.skipped.is_empty() {
            warn!(skipped = schema.skipped.len(), "Some tables could not be described");
        }
        info!(
            db_type = %schema.database_type,
            tables = schema.table_count,
            "get_schema completed"
        );
        Ok(schema)
    }
}
