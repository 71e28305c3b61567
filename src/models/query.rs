//! Query-related data models.
//!
//! This module defines types for SQL query requests and results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row cap for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Maximum allowed row cap.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
    /// Row cap for this request; clamped to the server cap.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Create a new query request with default options.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            limit: None,
        }
    }

    /// Add a parameter to this query.
    pub fn with_param(mut self, param: QueryParam) -> Self {
        self.params.push(param);
        self
    }

    /// Replace the parameter list.
    pub fn with_params(mut self, params: Vec<QueryParam>) -> Self {
        self.params = params;
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Get the effective row limit, bounded by `cap`.
    pub fn effective_limit(&self, cap: u32) -> u32 {
        let cap = cap.clamp(1, MAX_ROW_LIMIT);
        self.limit.map(|l| l.clamp(1, cap)).unwrap_or(cap)
    }
}

/// Rows returned by one statement.
///
/// `columns` and the keys of every row follow the statement's projection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// True when more rows were available than the row cap allowed.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(
        sql: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<serde_json::Map<String, JsonValue>>,
        truncated: bool,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            sql: sql.into(),
            columns,
            rows,
            row_count,
            truncated,
            execution_time_ms,
        }
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a JsonValue> {
        self.rows.iter().filter_map(move |row| row.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_limit_defaults_to_cap() {
        let req = QueryRequest::new("SELECT 1");
        assert_eq!(req.effective_limit(500), 500);
    }

    #[test]
    fn test_effective_limit_clamped() {
        assert_eq!(QueryRequest::new("SELECT 1").with_limit(50).effective_limit(20), 20);
        assert_eq!(QueryRequest::new("SELECT 1").with_limit(0).effective_limit(20), 1);
        assert_eq!(
            QueryRequest::new("SELECT 1").effective_limit(MAX_ROW_LIMIT + 5),
            MAX_ROW_LIMIT
        );
    }

    #[test]
    fn test_query_param_untagged() {
        let params: Vec<QueryParam> = serde_json::from_str(r#"[null, true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(3),
                QueryParam::Float(1.5),
                QueryParam::String("x".into()),
            ]
        );
        assert!(params[0].is_null());
        assert_eq!(params[2].type_name(), "int");
    }

    #[test]
    fn test_result_keeps_column_order() {
        let mut row = serde_json::Map::new();
        row.insert("zeta".into(), JsonValue::from(1));
        row.insert("alpha".into(), JsonValue::from(2));
        let result = QueryResult::new(
            "SELECT zeta, alpha",
            vec!["zeta".into(), "alpha".into()],
            vec![row],
            false,
            0,
        );
        let keys: Vec<&String> = result.rows[0].keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.column_values("alpha").next(), Some(&JsonValue::from(2)));
    }
}
