//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection resolution with the demo SQLite fallback
//! - Query execution
//! - Schema introspection
//! - Type mappings

pub mod demo;
pub mod executor;
pub mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionResolver, DbHandle, DbPool, ResolverSettings};
pub use schema::SchemaInspector;
