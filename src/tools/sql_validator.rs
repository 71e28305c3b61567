//! Read-only enforcement for `run_query`.
//!
//! Statements are parsed with [sqlparser](https://docs.rs/sqlparser/) in the
//! dialect of the connected database and classified from the AST. Reads pass,
//! anything that could change data or session state is rejected before it
//! reaches the driver.
//!
//! Query bodies are walked rather than trusted: `WITH ... DELETE` parses as a
//! query, and the data-modifying body is what decides.
//!
//! Text the parser cannot handle is scanned token by token. Segments that
//! lead with a modifying keyword, or contain one anywhere, are rejected. The
//! rest goes to the driver, whose syntax error is more useful to the caller
//! than a parser message.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

/// Broad category of a parsed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, VALUES, SHOW, EXPLAIN of a read
    Read,
    /// INSERT, UPDATE, DELETE, MERGE, COPY
    Write,
    /// CREATE, ALTER, DROP, TRUNCATE
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// GRANT, SET, VACUUM, ATTACH, procedure calls
    Administrative,
    Other,
}

mod messages {
    pub const WRITE: &str = "Data modification is disabled on this server.";
    pub const DDL: &str = "Schema changes are disabled on this server.";
    pub const TRANSACTION: &str =
        "Transaction control is not available; each query runs on its own.";
    pub const ADMINISTRATIVE: &str = "Administrative statements are disabled on this server.";
    pub const OTHER: &str = "Only read-only statements are accepted.";
}

fn dialect_for(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL | DatabaseType::MariaDB => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Reject statements that are not read-only.
///
/// Every statement in a multi-statement string must be a read.
pub fn check_read_only(sql: &str, db_type: DatabaseType) -> DbResult<()> {
    let dialect = dialect_for(db_type);

    let statements = match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!(error = %e, "SQL not parseable, scanning tokens");
            return scan_unparsed(sql, dialect.as_ref());
        }
    };

    for stmt in &statements {
        let (kind, operation) = classify(stmt);
        reject(kind, operation)?;
    }

    Ok(())
}

fn reject(kind: StatementKind, operation: &str) -> DbResult<()> {
    let reason = match kind {
        StatementKind::Read => return Ok(()),
        StatementKind::Write => messages::WRITE,
        StatementKind::Ddl => messages::DDL,
        StatementKind::Transaction => messages::TRANSACTION,
        StatementKind::Administrative => messages::ADMINISTRATIVE,
        StatementKind::Other => messages::OTHER,
    };
    Err(DbError::read_only(operation, reason))
}

/// Keywords that make a statement non-read when they lead it.
fn leading_keyword_kind(word: &str) -> Option<StatementKind> {
    let kind = match word {
        "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "MERGE" | "UPSERT" | "COPY" | "LOAD" => {
            StatementKind::Write
        }
        "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "RENAME" | "COMMENT" => StatementKind::Ddl,
        "BEGIN" | "START" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
            StatementKind::Transaction
        }
        "REINDEX" | "ANALYZE" | "VACUUM" | "ATTACH" | "DETACH" | "GRANT" | "REVOKE" | "SET"
        | "RESET" | "USE" | "CALL" | "EXEC" | "EXECUTE" | "PREPARE" | "DEALLOCATE" | "DO"
        | "LOCK" | "UNLOCK" | "OPTIMIZE" | "REPAIR" | "FLUSH" | "KILL" | "HANDLER" | "CLUSTER"
        | "REFRESH" | "LISTEN" | "NOTIFY" | "DISCARD" | "CHECKPOINT" | "INSTALL" | "UNINSTALL" => {
            StatementKind::Administrative
        }
        _ => return None,
    };
    Some(kind)
}

/// Keywords that modify data or schema wherever they appear.
fn embedded_keyword_kind(word: &str) -> Option<StatementKind> {
    match word {
        "INSERT" | "UPDATE" | "DELETE" | "MERGE" => Some(StatementKind::Write),
        "CREATE" | "ALTER" | "DROP" | "TRUNCATE" => Some(StatementKind::Ddl),
        "REINDEX" | "VACUUM" | "ATTACH" | "DETACH" | "GRANT" | "REVOKE" => {
            Some(StatementKind::Administrative)
        }
        _ => None,
    }
}

/// Check SQL the parser rejected, one `;`-separated segment at a time.
fn scan_unparsed(sql: &str, dialect: &dyn Dialect) -> DbResult<()> {
    let tokens = Tokenizer::new(dialect, sql).tokenize().map_err(|e| {
        DbError::validation(format!("SQL could not be tokenized: {}", e))
    })?;

    for segment in tokens.split(|t| matches!(t, Token::SemiColon)) {
        let mut words = segment.iter().filter_map(|t| match t {
            Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_ascii_uppercase()),
            _ => None,
        });

        let leads_with_word = segment
            .iter()
            .find(|t| !matches!(t, Token::Whitespace(_) | Token::LParen))
            .is_some_and(|t| matches!(t, Token::Word(_)));
        if leads_with_word {
            if let Some(first) = words.next() {
                if let Some(kind) = leading_keyword_kind(&first) {
                    return reject(kind, &first);
                }
            }
        }

        for word in words {
            if let Some(kind) = embedded_keyword_kind(&word) {
                return reject(kind, &word);
            }
        }
    }

    Ok(())
}

/// Classify a query by everything it runs: CTE bodies, set operation arms
/// and data-modifying bodies.
fn query_kind(query: &Query) -> (StatementKind, &'static str) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let kind = query_kind(&cte.query);
            if kind.0 != StatementKind::Read {
                return kind;
            }
        }
    }
    set_expr_kind(&query.body)
}

fn set_expr_kind(body: &SetExpr) -> (StatementKind, &'static str) {
    match body {
        SetExpr::Select(select) if select.into.is_some() => (StatementKind::Ddl, "SELECT INTO"),
        SetExpr::Select(_) | SetExpr::Values(_) | SetExpr::Table(_) => {
            (StatementKind::Read, "SELECT")
        }
        SetExpr::Query(query) => query_kind(query),
        SetExpr::SetOperation { left, right, .. } => match set_expr_kind(left) {
            (StatementKind::Read, _) => set_expr_kind(right),
            kind => kind,
        },
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) | SetExpr::Delete(stmt) | SetExpr::Merge(stmt) => {
            classify(stmt)
        }
    }
}

/// Classify a parsed statement.
pub fn classify(stmt: &Statement) -> (StatementKind, &'static str) {
    match stmt {
        Statement::Query(query) => query_kind(query),
        Statement::ShowTables { .. } => (StatementKind::Read, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (StatementKind::Read, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (StatementKind::Read, "SHOW DATABASES"),
        Statement::ShowSchemas { .. } => (StatementKind::Read, "SHOW SCHEMAS"),
        Statement::ShowCreate { .. } => (StatementKind::Read, "SHOW CREATE"),
        Statement::ShowVariables { .. } => (StatementKind::Read, "SHOW VARIABLES"),
        Statement::ExplainTable { .. } => (StatementKind::Read, "DESCRIBE"),

        // EXPLAIN ANALYZE runs the inner statement, so classify that instead
        Statement::Explain { statement, .. } => match classify(statement) {
            (StatementKind::Read, _) => (StatementKind::Read, "EXPLAIN"),
            inner => inner,
        },

        // Reading a pragma is harmless; assigning one changes the connection
        Statement::Pragma { value: None, .. } => (StatementKind::Read, "PRAGMA"),
        Statement::Pragma { .. } => (StatementKind::Administrative, "PRAGMA"),

        Statement::Insert { .. } => (StatementKind::Write, "INSERT"),
        Statement::Update { .. } => (StatementKind::Write, "UPDATE"),
        Statement::Delete { .. } => (StatementKind::Write, "DELETE"),
        Statement::Merge { .. } => (StatementKind::Write, "MERGE"),
        Statement::Copy { .. } => (StatementKind::Write, "COPY"),

        Statement::CreateTable { .. } => (StatementKind::Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (StatementKind::Ddl, "CREATE VIEW"),
        Statement::CreateIndex { .. } => (StatementKind::Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (StatementKind::Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (StatementKind::Ddl, "CREATE DATABASE"),
        Statement::CreateTrigger { .. } => (StatementKind::Ddl, "CREATE TRIGGER"),
        Statement::CreateVirtualTable { .. } => (StatementKind::Ddl, "CREATE VIRTUAL TABLE"),
        Statement::AlterTable { .. } => (StatementKind::Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (StatementKind::Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (StatementKind::Ddl, "ALTER INDEX"),
        Statement::Drop { .. } => (StatementKind::Ddl, "DROP"),
        Statement::DropTrigger { .. } => (StatementKind::Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (StatementKind::Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (StatementKind::Ddl, "COMMENT"),

        Statement::StartTransaction { .. } => (StatementKind::Transaction, "BEGIN"),
        Statement::Commit { .. } => (StatementKind::Transaction, "COMMIT"),
        Statement::Rollback { .. } => (StatementKind::Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (StatementKind::Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (StatementKind::Transaction, "RELEASE SAVEPOINT"),

        Statement::Call { .. } => (StatementKind::Administrative, "CALL"),
        Statement::Execute { .. } => (StatementKind::Administrative, "EXECUTE"),
        Statement::Prepare { .. } => (StatementKind::Administrative, "PREPARE"),
        Statement::Grant { .. } => (StatementKind::Administrative, "GRANT"),
        Statement::Revoke { .. } => (StatementKind::Administrative, "REVOKE"),
        Statement::Set { .. } => (StatementKind::Administrative, "SET"),
        Statement::Use { .. } => (StatementKind::Administrative, "USE"),
        Statement::Kill { .. } => (StatementKind::Administrative, "KILL"),
        Statement::Vacuum { .. } => (StatementKind::Administrative, "VACUUM"),
        Statement::Analyze { .. } => (StatementKind::Administrative, "ANALYZE"),
        Statement::LockTables { .. } => (StatementKind::Administrative, "LOCK"),
        Statement::AttachDatabase { .. } => (StatementKind::Administrative, "ATTACH"),

        _ => (StatementKind::Other, "UNKNOWN"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SQLITE: DatabaseType = DatabaseType::SQLite;

    #[test]
    fn test_select_allowed() {
        assert!(check_read_only("SELECT * FROM machines", SQLITE).is_ok());
        assert!(check_read_only("SELECT 1", DatabaseType::PostgreSQL).is_ok());
        assert!(check_read_only("SELECT 1", DatabaseType::MariaDB).is_ok());
    }

    #[test]
    fn test_cte_and_subquery_allowed() {
        let sql = r#"
            WITH downtime AS (
                SELECT machine_id, SUM(downtime_hours) AS hours
                FROM maintenance_logs GROUP BY machine_id
            )
            SELECT m.name, d.hours FROM machines m JOIN downtime d ON d.machine_id = m.id
            WHERE m.id IN (SELECT machine_id FROM maintenance_logs WHERE resolved = 0)
        "#;
        assert!(check_read_only(sql, SQLITE).is_ok());
    }

    #[test]
    fn test_insert_rejected() {
        let err = check_read_only("INSERT INTO factories (id) VALUES (9)", SQLITE).unwrap_err();
        assert!(matches!(err, DbError::ReadOnly { .. }));
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("INSERT"));
    }

    #[test]
    fn test_ddl_rejected() {
        assert!(check_read_only("DROP TABLE machines", SQLITE).is_err());
        assert!(check_read_only("CREATE TABLE t (id INT)", SQLITE).is_err());
    }

    #[test]
    fn test_write_hidden_after_read_rejected() {
        let sql = "SELECT 1; DELETE FROM work_orders";
        assert!(check_read_only(sql, SQLITE).is_err());
    }

    #[test]
    fn test_transaction_control_rejected() {
        assert!(check_read_only("BEGIN", DatabaseType::PostgreSQL).is_err());
    }

    #[test]
    fn test_unparseable_passes_through() {
        assert!(check_read_only("SELEC 1", SQLITE).is_ok());
        assert!(check_read_only("SELECT * FROM parts INDEXED BY idx_parts_sku", SQLITE).is_ok());
    }

    #[test]
    fn test_modifying_cte_body_rejected() {
        let err = check_read_only("WITH x AS (SELECT 1) DELETE FROM work_order_parts", SQLITE)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("DELETE"));

        let sql = "WITH gone AS (DELETE FROM parts RETURNING id) SELECT * FROM gone";
        assert!(check_read_only(sql, DatabaseType::PostgreSQL).is_err());

        let sql = "WITH x AS (SELECT 1) UPDATE parts SET stock_quantity = 0";
        assert!(check_read_only(sql, SQLITE).is_err());
    }

    #[test]
    fn test_select_into_rejected() {
        let sql = "SELECT * INTO parts_copy FROM parts";
        assert!(check_read_only(sql, DatabaseType::PostgreSQL).is_err());
    }

    #[test]
    fn test_unparseable_write_rejected() {
        let sql = "UPDATE parts INDEXED BY sqlite_autoindex_parts_1 SET stock_quantity = 0";
        let err = check_read_only(sql, SQLITE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(err.to_string().contains("UPDATE"));

        let sql = "WITH x AS (SELECT 1) DELETE FROM parts INDEXED BY sqlite_autoindex_parts_1";
        assert!(check_read_only(sql, SQLITE).is_err());
    }

    #[test]
    fn test_maintenance_commands_rejected() {
        for sql in ["REINDEX", "ANALYZE", "REINDEX parts", "VACUUM"] {
            let err = check_read_only(sql, SQLITE).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError, "{}", sql);
        }
    }

    #[test]
    fn test_explain_of_select_allowed() {
        assert!(check_read_only("EXPLAIN SELECT * FROM parts", DatabaseType::PostgreSQL).is_ok());
    }
}
