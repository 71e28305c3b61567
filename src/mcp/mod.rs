//! MCP server integration module.
//!
//! This module provides the integration between the MCP protocol and
//! the tool handlers using the rmcp framework.

pub mod catalog;
pub mod service;

pub use catalog::{ToolCall, ToolName, ToolResponse};
pub use service::ManufacturingService;
