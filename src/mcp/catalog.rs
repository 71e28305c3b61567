//! Tool catalog and response envelope.
//!
//! `ToolName` is the closed set of tools the server offers. `ToolCall` pairs
//! a tool with its decoded arguments, so a call that reaches dispatch is
//! always well-formed. Every outcome, success or failure, is reported in a
//! `ToolResponse` envelope.

use crate::error::{DbError, DbResult, ErrorKind};
use crate::tools::{
    GetMachinesInput, GetWorkOrdersInput, InventoryStatusInput, ListFactoriesInput,
    MaintenanceReportInput, QualitySummaryInput, RunQueryInput,
};
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    GetSchema,
    RunQuery,
    ListFactories,
    GetMachines,
    GetWorkOrders,
    QualitySummary,
    MaintenanceReport,
    InventoryStatus,
    SupplierPerformance,
    OperatorPerformance,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        Self::GetSchema,
        Self::RunQuery,
        Self::ListFactories,
        Self::GetMachines,
        Self::GetWorkOrders,
        Self::QualitySummary,
        Self::MaintenanceReport,
        Self::InventoryStatus,
        Self::SupplierPerformance,
        Self::OperatorPerformance,
    ];

    /// Wire name of the tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetSchema => "get_schema",
            Self::RunQuery => "run_query",
            Self::ListFactories => "list_factories",
            Self::GetMachines => "get_machines",
            Self::GetWorkOrders => "get_work_orders",
            Self::QualitySummary => "quality_summary",
            Self::MaintenanceReport => "maintenance_report",
            Self::InventoryStatus => "inventory_status",
            Self::SupplierPerformance => "supplier_performance",
            Self::OperatorPerformance => "operator_performance",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| DbError::unknown_tool(s))
    }
}

/// Arguments for tools that take none.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// A tool together with its decoded arguments.
#[derive(Debug, Clone)]
pub enum ToolCall {
    GetSchema,
    RunQuery(RunQueryInput),
    ListFactories(ListFactoriesInput),
    GetMachines(GetMachinesInput),
    GetWorkOrders(GetWorkOrdersInput),
    QualitySummary(QualitySummaryInput),
    MaintenanceReport(MaintenanceReportInput),
    InventoryStatus(InventoryStatusInput),
    SupplierPerformance,
    OperatorPerformance,
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            Self::GetSchema => ToolName::GetSchema,
            Self::RunQuery(_) => ToolName::RunQuery,
            Self::ListFactories(_) => ToolName::ListFactories,
            Self::GetMachines(_) => ToolName::GetMachines,
            Self::GetWorkOrders(_) => ToolName::GetWorkOrders,
            Self::QualitySummary(_) => ToolName::QualitySummary,
            Self::MaintenanceReport(_) => ToolName::MaintenanceReport,
            Self::InventoryStatus(_) => ToolName::InventoryStatus,
            Self::SupplierPerformance => ToolName::SupplierPerformance,
            Self::OperatorPerformance => ToolName::OperatorPerformance,
        }
    }

    /// Decode a call from its wire name and JSON arguments.
    ///
    /// Missing or `null` arguments are treated as an empty object. Unknown
    /// names fail with `UnknownToolError`, malformed arguments with
    /// `ValidationError`.
    pub fn decode(name: &str, arguments: Option<JsonValue>) -> DbResult<Self> {
        let tool: ToolName = name.parse()?;
        let args = match arguments {
            None | Some(JsonValue::Null) => JsonValue::Object(serde_json::Map::new()),
            Some(value) => value,
        };

        Ok(match tool {
            ToolName::GetSchema => {
                parse::<NoArgs>(tool, args)?;
                Self::GetSchema
            }
            ToolName::RunQuery => Self::RunQuery(parse(tool, args)?),
            ToolName::ListFactories => Self::ListFactories(parse(tool, args)?),
            ToolName::GetMachines => Self::GetMachines(parse(tool, args)?),
            ToolName::GetWorkOrders => Self::GetWorkOrders(parse(tool, args)?),
            ToolName::QualitySummary => Self::QualitySummary(parse(tool, args)?),
            ToolName::MaintenanceReport => Self::MaintenanceReport(parse(tool, args)?),
            ToolName::InventoryStatus => Self::InventoryStatus(parse(tool, args)?),
            ToolName::SupplierPerformance => {
                parse::<NoArgs>(tool, args)?;
                Self::SupplierPerformance
            }
            ToolName::OperatorPerformance => {
                parse::<NoArgs>(tool, args)?;
                Self::OperatorPerformance
            }
        })
    }
}

fn parse<T: DeserializeOwned>(tool: ToolName, args: JsonValue) -> DbResult<T> {
    serde_json::from_value(args)
        .map_err(|e| DbError::validation(format!("Invalid arguments for {}: {}", tool, e)))
}

/// Envelope returned for every tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse {
    Ok {
        tool: String,
        data: JsonValue,
    },
    Error {
        tool: String,
        error_type: ErrorKind,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
}

impl ToolResponse {
    pub fn ok(tool: impl Into<String>, data: JsonValue) -> Self {
        Self::Ok {
            tool: tool.into(),
            data,
        }
    }

    pub fn error(tool: impl Into<String>, error: &DbError) -> Self {
        Self::Error {
            tool: tool.into(),
            error_type: error.kind(),
            message: error.to_string(),
            suggestion: error.suggestion().map(str::to_string),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn tool(&self) -> &str {
        match self {
            Self::Ok { tool, .. } | Self::Error { tool, .. } => tool,
        }
    }

    /// Payload of a successful call.
    pub fn data(&self) -> Option<&JsonValue> {
        match self {
            Self::Ok { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    pub fn error_type(&self) -> Option<ErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { error_type, .. } => Some(*error_type),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Wrap the envelope as MCP text content; error envelopes set `is_error`.
    pub fn into_call_result(self) -> CallToolResult {
        let text = serde_json::to_string_pretty(&self).unwrap_or_default();
        if self.is_error() {
            CallToolResult::error(vec![Content::text(text)])
        } else {
            CallToolResult::success(vec![Content::text(text)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
    }

    #[test]
    fn test_unknown_tool_name() {
        let err = "drop_everything".parse::<ToolName>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownToolError);
    }

    #[test]
    fn test_decode_defaults_missing_arguments() {
        let call = ToolCall::decode("get_work_orders", None).unwrap();
        match call {
            ToolCall::GetWorkOrders(input) => assert_eq!(input.limit, 20),
            other => panic!("unexpected call: {:?}", other),
        }
        assert!(matches!(
            ToolCall::decode("supplier_performance", Some(JsonValue::Null)).unwrap(),
            ToolCall::SupplierPerformance
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_arguments() {
        let err = ToolCall::decode("run_query", Some(json!({"sql": 42}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = ToolCall::decode("get_schema", Some(json!({"table": "x"}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_envelope_shapes() {
        let ok = ToolResponse::ok("run_query", json!({"rows": []})).to_json();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["tool"], "run_query");
        assert!(ok.get("error_type").is_none());

        let err = DbError::query("near \"SELEC\": syntax error", None, "Check the SQL");
        let env = ToolResponse::error("run_query", &err).to_json();
        assert_eq!(env["status"], "error");
        assert_eq!(env["error_type"], "QueryError");
        assert!(env["message"].as_str().unwrap().contains("SELEC"));
        assert_eq!(env["suggestion"], "Check the SQL");
    }

    #[test]
    fn test_error_envelope_sets_is_error() {
        let response = ToolResponse::error("get_schema", &DbError::internal("boom"));
        let result = response.into_call_result();
        assert_eq!(result.is_error, Some(true));
    }
}
