//! Free-form query tool.
//!
//! This module implements the `run_query` MCP tool. Unless the server was
//! started with `--allow-write-queries`, statements are checked against the
//! read-only policy before they reach the database.

use crate::db::{ConnectionResolver, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{MAX_ROW_LIMIT, QueryRequest, QueryResult};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the run_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RunQueryInput {
    /// SQL statement to execute. Call get_schema first to learn table and column names.
    pub sql: String,
    /// Maximum rows to return. Defaults to the server row cap.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl RunQueryInput {
    pub fn validate(&self) -> DbResult<()> {
        if self.sql.trim().is_empty() {
            return Err(DbError::validation("sql cannot be empty"));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > MAX_ROW_LIMIT {
                return Err(DbError::validation(format!(
                    "limit must be between 1 and {}, got {}",
                    MAX_ROW_LIMIT, limit
                )));
            }
        }
        Ok(())
    }
}

/// Handler for the run_query tool.
pub struct QueryToolHandler {
    resolver: Arc<ConnectionResolver>,
    executor: QueryExecutor,
    allow_writes: bool,
}

impl QueryToolHandler {
    pub fn new(resolver: Arc<ConnectionResolver>, executor: QueryExecutor, allow_writes: bool) -> Self {
        Self {
            resolver,
            executor,
            allow_writes,
        }
    }

    /// Run one statement and return its rows.
    ///
    /// Driver errors come back as `QueryError` with the driver's message.
    pub async fn run_query(&self, input: RunQueryInput) -> DbResult<QueryResult> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        if !self.allow_writes {
            sql_validator::check_read_only(&input.sql, handle.db_type())?;
        }

        let mut request = QueryRequest::new(input.sql);
        if let Some(limit) = input.limit {
            request = request.with_limit(limit);
        }

        let result = self.executor.execute(&handle, &request).await?;
        info!(
            rows = result.row_count,
            truncated = result.truncated,
            execution_time_ms = result.execution_time_ms,
            "run_query completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_sql() {
        let input = RunQueryInput {
            sql: "   ".into(),
            limit: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_validate_limit_range() {
        let mut input = RunQueryInput {
            sql: "SELECT 1".into(),
            limit: Some(0),
        };
        assert!(input.validate().is_err());
        input.limit = Some(MAX_ROW_LIMIT + 1);
        assert!(input.validate().is_err());
        input.limit = Some(50);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_requires_sql() {
        let parsed = serde_json::from_value::<RunQueryInput>(serde_json::json!({"limit": 5}));
        assert!(parsed.is_err());
    }
}
