//! Configuration handling for the manufacturing MCP server.
//!
//! Every setting is a CLI flag mirrored by an environment variable.

use crate::models::MAX_ROW_LIMIT;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_ROWS: u32 = 1000;
pub const DEFAULT_DEMO_DB: &str = "manufacturing.db";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for networked clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "manufacturing-mcp-server")]
#[command(author, version, about = "MCP server exposing a manufacturing database to AI assistants")]
pub struct Config {
    /// Database connection string (sqlite:, postgres://, mysql://, mariadb://).
    /// When absent, the bundled demo database is used.
    #[arg(short = 'd', long = "database", value_name = "URL", env = "MCP_DATABASE")]
    pub database: Option<String>,

    /// Path of the demo SQLite database, created and seeded on first use
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DEMO_DB, env = "MCP_DEMO_DB")]
    pub demo_db: PathBuf,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "MCP_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Maximum rows returned by a single query
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS, env = "MCP_MAX_ROWS")]
    pub max_rows: u32,

    /// Allow run_query to execute statements other than reads
    #[arg(long, env = "MCP_ALLOW_WRITE_QUERIES")]
    pub allow_write_queries: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            database: None,
            demo_db: PathBuf::from(DEFAULT_DEMO_DB),
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_rows: DEFAULT_MAX_ROWS,
            allow_write_queries: false,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Check values clap cannot express as ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.query_timeout == 0 {
            return Err("query_timeout must be greater than 0".to_string());
        }
        if self.connect_timeout == 0 {
            return Err("connect_timeout must be greater than 0".to_string());
        }
        if self.max_rows == 0 || self.max_rows > MAX_ROW_LIMIT {
            return Err(format!(
                "max_rows must be between 1 and {} (got {})",
                MAX_ROW_LIMIT, self.max_rows
            ));
        }
        if !self.mcp_endpoint.starts_with('/') {
            return Err(format!(
                "mcp_endpoint must start with '/' (got '{}')",
                self.mcp_endpoint
            ));
        }
        Ok(())
    }

    /// The configured connection string, with blank values treated as absent.
    pub fn database_descriptor(&self) -> Option<String> {
        self.database
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.demo_db, PathBuf::from("manufacturing.db"));
        assert!(!config.allow_write_queries);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_timeout_durations() {
        let config = Config {
            query_timeout: 60,
            connect_timeout: 15,
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(15));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let config = Config {
            query_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("query_timeout"));

        let config = Config {
            connect_timeout: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().contains("connect_timeout"));
    }

    #[test]
    fn test_validate_max_rows_bounds() {
        let config = Config {
            max_rows: MAX_ROW_LIMIT + 1,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_rows: MAX_ROW_LIMIT,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_endpoint_path() {
        let config = Config {
            mcp_endpoint: "mcp".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_database_is_absent() {
        let config = Config {
            database: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.database_descriptor(), None);

        let config = Config {
            database: Some(" sqlite:plant.db ".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.database_descriptor().as_deref(),
            Some("sqlite:plant.db")
        );
    }

    #[test]
    fn test_parse_from_cli_args() {
        let config = Config::try_parse_from([
            "manufacturing-mcp-server",
            "--database",
            "postgres://u:p@localhost/plant",
            "--transport",
            "http",
            "--max-rows",
            "50",
            "--allow-write-queries",
        ])
        .unwrap();
        assert_eq!(
            config.database.as_deref(),
            Some("postgres://u:p@localhost/plant")
        );
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.max_rows, 50);
        assert!(config.allow_write_queries);
    }
}
