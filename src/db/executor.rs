//! Query execution.
//!
//! `QueryExecutor` runs one statement on the shared handle with bound
//! parameters, a row cap and a timeout, and converts the rows to JSON.
//! Rows are streamed and the stream is dropped one row past the cap.

use crate::db::params::bind_params;
use crate::db::pool::{DbHandle, DbPool};
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryParam, QueryRequest,
    QueryResult,
};
use futures_util::StreamExt;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::BoxStream;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
    row_cap: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            row_cap: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create a new query executor with custom settings.
    pub fn with_defaults(timeout_secs: u64, row_cap: u32) -> Self {
        Self {
            query_timeout: Duration::from_secs(timeout_secs.max(1)),
            row_cap: row_cap.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn row_cap(&self) -> u32 {
        self.row_cap
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Run one free-form statement with no parameters.
    pub async fn run_query(&self, handle: &DbHandle, sql: &str) -> DbResult<QueryResult> {
        self.execute(handle, &QueryRequest::new(sql)).await
    }

    /// Execute a statement and return its rows.
    pub async fn execute(&self, handle: &DbHandle, request: &QueryRequest) -> DbResult<QueryResult> {
        let sql = request.sql.trim();
        if sql.is_empty() {
            return Err(DbError::validation("SQL statement cannot be empty"));
        }

        let start = Instant::now();
        let row_limit = request.effective_limit(self.row_cap);
        let query_timeout = self.query_timeout;

        debug!(
            sql = %sql,
            params = request.params.len(),
            limit = row_limit,
            timeout_secs = query_timeout.as_secs(),
            "Executing query"
        );

        let (columns, rows) = match handle.pool() {
            DbPool::MySql(p) => {
                let rows =
                    mysql::fetch_rows(p, sql, &request.params, row_limit, query_timeout).await?;
                let columns = match rows.first() {
                    Some(row) => row.column_names(),
                    None => mysql::describe_columns(p, sql).await,
                };
                (columns, convert_rows(&rows))
            }
            DbPool::Postgres(p) => {
                let rows =
                    postgres::fetch_rows(p, sql, &request.params, row_limit, query_timeout).await?;
                let columns = match rows.first() {
                    Some(row) => row.column_names(),
                    None => postgres::describe_columns(p, sql).await,
                };
                (columns, convert_rows(&rows))
            }
            DbPool::SQLite(p) => {
                let rows =
                    sqlite::fetch_rows(p, sql, &request.params, row_limit, query_timeout).await?;
                let columns = match rows.first() {
                    Some(row) => row.column_names(),
                    None => sqlite::describe_columns(p, sql).await,
                };
                (columns, convert_rows(&rows))
            }
        };

        Ok(finish(sql, columns, rows, row_limit, start))
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_rows<R: RowToJson>(rows: &[R]) -> Vec<serde_json::Map<String, serde_json::Value>> {
    rows.iter().map(RowToJson::to_json_map).collect()
}

/// Apply the row cap and build the result.
fn finish(
    sql: &str,
    columns: Vec<String>,
    mut rows: Vec<serde_json::Map<String, serde_json::Value>>,
    row_limit: u32,
    start: Instant,
) -> QueryResult {
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;
    if truncated {
        rows.truncate(row_limit as usize);
        warn!(limit = row_limit, "Query result truncated");
    }

    let execution_time_ms = start.elapsed().as_millis() as u64;
    debug!(
        rows = rows.len(),
        execution_time_ms, "Query completed"
    );
    QueryResult::new(sql, columns, rows, truncated, execution_time_ms)
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    results
        .into_iter()
        .map(|result| result.map_err(DbError::from))
        .collect()
}

/// Drain at most `row_limit + 1` rows so truncation can be detected.
async fn collect_capped<R>(
    stream: BoxStream<'_, Result<R, sqlx::Error>>,
    row_limit: u32,
    query_timeout: Duration,
) -> DbResult<Vec<R>> {
    let fetch_limit = row_limit as usize + 1;
    match timeout(query_timeout, stream.take(fetch_limit).collect::<Vec<_>>()).await {
        Ok(results) => collect_rows(results),
        Err(_) => Err(DbError::timeout("query execution", query_timeout.as_secs())),
    }
}

fn described_names<C: sqlx::Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

// =============================================================================
// Per-driver fetching
// =============================================================================
//
// `fetch_rows` returns a boxed future so callers can hold it across awaits
// inside `Send` tool futures. Statements without parameters go through the
// driver's simple query path.

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Executor, MySqlPool};

    pub fn fetch_rows<'a>(
        pool: &'a MySqlPool,
        sql: &'a str,
        params: &'a [QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> BoxFuture<'a, DbResult<Vec<MySqlRow>>> {
        async move {
            let stream = if params.is_empty() {
                pool.fetch(sql)
            } else {
                bind_params(sqlx::query(sql), params).fetch(pool)
            };
            collect_capped(stream, row_limit, query_timeout).await
        }
        .boxed()
    }

    /// Column names for a statement that returned no rows.
    pub async fn describe_columns(pool: &MySqlPool, sql: &str) -> Vec<String> {
        match pool.describe(sql).await {
            Ok(described) => described_names(described.columns()),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Executor, PgPool};

    pub fn fetch_rows<'a>(
        pool: &'a PgPool,
        sql: &'a str,
        params: &'a [QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> BoxFuture<'a, DbResult<Vec<PgRow>>> {
        async move {
            let stream = if params.is_empty() {
                pool.fetch(sql)
            } else {
                bind_params(sqlx::query(sql), params).fetch(pool)
            };
            collect_capped(stream, row_limit, query_timeout).await
        }
        .boxed()
    }

    pub async fn describe_columns(pool: &PgPool, sql: &str) -> Vec<String> {
        match pool.describe(sql).await {
            Ok(described) => described_names(described.columns()),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Executor, SqlitePool};

    pub fn fetch_rows<'a>(
        pool: &'a SqlitePool,
        sql: &'a str,
        params: &'a [QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> BoxFuture<'a, DbResult<Vec<SqliteRow>>> {
        async move {
            let stream = if params.is_empty() {
                pool.fetch(sql)
            } else {
                bind_params(sqlx::query(sql), params).fetch(pool)
            };
            collect_capped(stream, row_limit, query_timeout).await
        }
        .boxed()
    }

    pub async fn describe_columns(pool: &SqlitePool, sql: &str) -> Vec<String> {
        match pool.describe(sql).await {
            Ok(described) => described_names(described.columns()),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }
}
