//! Manufacturing MCP Server Library
//!
//! This library exposes a manufacturing database to AI assistants over MCP
//! (Model Context Protocol): schema discovery, free-form read queries and a
//! set of ready-made production reports. With no database configured, a
//! seeded demo SQLite database is created on first use.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::ManufacturingService;
