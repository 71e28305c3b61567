//! MCP tool implementations.
//!
//! This module contains the database tool handlers:
//! - `query`: `run_query`, free-form SQL under the read-only policy
//! - `schema`: `get_schema`, tables, columns and foreign keys
//! - `reports`: the eight manufacturing convenience reports
//! - `sql_validator`: SQL statement classification for read-only enforcement

pub mod query;
pub mod reports;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryToolHandler, RunQueryInput};
pub use reports::{
    GetMachinesInput, GetWorkOrdersInput, InventoryStatusInput, ListFactoriesInput,
    MaintenanceReportInput, QualitySummaryInput, ReportOutput, ReportToolHandler,
};
pub use schema::SchemaToolHandler;
