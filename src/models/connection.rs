//! Connection-related data models.
//!
//! This module defines the driver families the server can talk to and the
//! parsed form of the configured connection string.

use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Supported database types, one per driver family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Embedded file database
    SQLite,
    PostgreSQL,
    MySQL,
    /// Speaks the MySQL wire protocol
    MariaDB,
}

impl DatabaseType {
    /// Every family, in scheme-matching order.
    pub const ALL: [DatabaseType; 4] = [
        DatabaseType::SQLite,
        DatabaseType::PostgreSQL,
        DatabaseType::MySQL,
        DatabaseType::MariaDB,
    ];

    /// URL scheme prefixes recognized for this family.
    pub fn schemes(&self) -> &'static [&'static str] {
        match self {
            Self::SQLite => &["sqlite://", "sqlite:"],
            Self::PostgreSQL => &["postgres://", "postgresql://"],
            Self::MySQL => &["mysql://"],
            Self::MariaDB => &["mariadb://"],
        }
    }

    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|db| db.schemes().iter().any(|s| lower.starts_with(s)))
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SQLite => "SQLite",
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::MariaDB => "MariaDB",
        }
    }

    /// Whether this family is served by the MySQL driver.
    pub fn uses_mysql_driver(&self) -> bool {
        matches!(self, Self::MySQL | Self::MariaDB)
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${index}"),
            _ => "?".to_string(),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where the resolver should connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// The bundled demo database, created and seeded when missing.
    Demo { path: PathBuf },
    /// A user-supplied connection string.
    Url {
        db_type: DatabaseType,
        connection_string: String,
    },
}

impl ConnectionTarget {
    /// Interpret the configured descriptor.
    ///
    /// An absent or blank descriptor selects the demo database. An unknown
    /// scheme is a connection error; it never falls back to the demo file.
    pub fn parse(descriptor: Option<&str>, demo_path: &Path) -> DbResult<Self> {
        let Some(raw) = descriptor.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::Demo {
                path: demo_path.to_path_buf(),
            });
        };

        let db_type = DatabaseType::from_connection_string(raw).ok_or_else(|| {
            DbError::connection(
                format!(
                    "Unrecognized connection string scheme: {}",
                    mask_connection_string(raw)
                ),
                "Use one of sqlite:, postgres://, postgresql://, mysql:// or mariadb://",
            )
        })?;

        Ok(Self::Url {
            db_type,
            connection_string: raw.to_string(),
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            Self::Demo { .. } => DatabaseType::SQLite,
            Self::Url { db_type, .. } => *db_type,
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Self::Demo { .. })
    }

    /// Display-safe description of the target (credentials masked).
    pub fn describe(&self) -> String {
        match self {
            Self::Demo { path } => format!("demo database at {}", path.display()),
            Self::Url {
                connection_string, ..
            } => mask_connection_string(connection_string),
        }
    }
}

/// Get a display-safe version of a connection string (password masked).
pub fn mask_connection_string(connection_string: &str) -> String {
    match Url::parse(connection_string) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_ok() {
                url.to_string()
            } else {
                connection_string.to_string()
            }
        }
        Ok(_) => connection_string.to_string(),
        Err(_) => {
            // Unparseable strings may still carry user:pass@host
            if let Some(at_pos) = connection_string.find('@') {
                if let Some(colon_pos) = connection_string[..at_pos].rfind(':') {
                    let prefix = &connection_string[..colon_pos + 1];
                    let suffix = &connection_string[at_pos..];
                    return format!("{}****{}", prefix, suffix);
                }
            }
            connection_string.to_string()
        }
    }
}

/// Rewrite a `mariadb://` URL so the MySQL driver accepts it.
pub fn to_mysql_url(connection_string: &str) -> DbResult<String> {
    let mut url = Url::parse(connection_string).map_err(|e| {
        DbError::connection(
            format!("Invalid connection URL: {e}"),
            "Check the connection string format",
        )
    })?;
    if url.scheme().eq_ignore_ascii_case("mariadb") {
        url.set_scheme("mysql").map_err(|_| {
            DbError::connection(
                "Cannot rewrite mariadb:// URL for the MySQL driver",
                "Use a mysql:// URL instead",
            )
        })?;
    }
    Ok(url.to_string())
}
