//! MCP service implementation using rmcp.
//!
//! `#[tool_router]` registers the ten tools with their schemas and
//! descriptions, which `tools/list` serves. `tools/call` does not go through
//! the router: `call_tool` hands the raw name and arguments to `invoke`, so
//! unknown tools and malformed arguments come back as error envelopes rather
//! than JSON-RPC errors.

use crate::db::{ConnectionResolver, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::mcp::catalog::{ToolCall, ToolName, ToolResponse};
use crate::tools::{
    GetMachinesInput, GetWorkOrdersInput, InventoryStatusInput, ListFactoriesInput,
    MaintenanceReportInput, QualitySummaryInput, QueryToolHandler, ReportToolHandler,
    RunQueryInput, SchemaToolHandler,
};
use futures_util::future::{BoxFuture, FutureExt};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_router,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ManufacturingService {
    /// Owner of the process-wide database handle
    resolver: Arc<ConnectionResolver>,
    executor: QueryExecutor,
    /// Skip the read-only check in run_query
    allow_writes: bool,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl ManufacturingService {
    pub fn new(
        resolver: Arc<ConnectionResolver>,
        executor: QueryExecutor,
        allow_writes: bool,
    ) -> Self {
        Self {
            resolver,
            executor,
            allow_writes,
            tool_router: Self::tool_router(),
        }
    }

    pub fn resolver(&self) -> &Arc<ConnectionResolver> {
        &self.resolver
    }

    /// Decode and run a call given by wire name and raw JSON arguments.
    pub async fn invoke(&self, name: &str, arguments: Option<JsonValue>) -> ToolResponse {
        info!(tool = name, "Tool call received");
        match ToolCall::decode(name, arguments) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => {
                warn!(tool = name, error_type = %e.kind(), error = %e, "Tool call rejected");
                ToolResponse::error(name, &e)
            }
        }
    }

    /// Run a decoded call and wrap the outcome in an envelope.
    ///
    /// The future is boxed so the `#[tool]` methods stay `Send` under the
    /// router's higher-ranked bounds.
    pub fn dispatch(&self, call: ToolCall) -> BoxFuture<'_, ToolResponse> {
        async move { self.run_call(call).await }.boxed()
    }

    async fn run_call(&self, call: ToolCall) -> ToolResponse {
        let tool = call.name();
        debug!(tool = %tool, "Dispatching tool call");

        let outcome = match call {
            ToolCall::GetSchema => {
                to_data(SchemaToolHandler::new(self.resolver.clone()).get_schema().await)
            }
            ToolCall::RunQuery(input) => to_data(self.query_handler().run_query(input).await),
            ToolCall::ListFactories(input) => {
                to_data(self.report_handler().list_factories(input).await)
            }
            ToolCall::GetMachines(input) => to_data(self.report_handler().get_machines(input).await),
            ToolCall::GetWorkOrders(input) => {
                to_data(self.report_handler().get_work_orders(input).await)
            }
            ToolCall::QualitySummary(input) => {
                to_data(self.report_handler().quality_summary(input).await)
            }
            ToolCall::MaintenanceReport(input) => {
                to_data(self.report_handler().maintenance_report(input).await)
            }
            ToolCall::InventoryStatus(input) => {
                to_data(self.report_handler().inventory_status(input).await)
            }
            ToolCall::SupplierPerformance => {
                to_data(self.report_handler().supplier_performance().await)
            }
            ToolCall::OperatorPerformance => {
                to_data(self.report_handler().operator_performance().await)
            }
        };

        match outcome {
            Ok(data) => {
                info!(tool = %tool, "Tool call responded");
                ToolResponse::ok(tool.as_str(), data)
            }
            Err(e) => {
                warn!(tool = %tool, error_type = %e.kind(), error = %e, "Tool call errored");
                ToolResponse::error(tool.as_str(), &e)
            }
        }
    }

    /// Check that the registered rmcp tools match the catalog exactly.
    pub fn verify_catalog(&self) -> DbResult<()> {
        let registered: BTreeSet<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        let expected: BTreeSet<String> = ToolName::ALL
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();

        if registered != expected {
            let missing: Vec<_> = expected.difference(&registered).collect();
            let extra: Vec<_> = registered.difference(&expected).collect();
            return Err(DbError::internal(format!(
                "Tool registry does not match the catalog (missing: {:?}, unexpected: {:?})",
                missing, extra
            )));
        }
        Ok(())
    }

    fn query_handler(&self) -> QueryToolHandler {
        QueryToolHandler::new(self.resolver.clone(), self.executor.clone(), self.allow_writes)
    }

    fn report_handler(&self) -> ReportToolHandler {
        ReportToolHandler::new(self.resolver.clone(), self.executor.clone())
    }
}

fn to_data<T: Serialize>(result: DbResult<T>) -> DbResult<JsonValue> {
    let value = result?;
    serde_json::to_value(value)
        .map_err(|e| DbError::internal(format!("Failed to serialize tool output: {}", e)))
}

#[tool_router]
impl ManufacturingService {
    #[tool(
        description = "Describe the database: every table with its columns (name, type, nullable, primary key) and foreign keys.\nCall this first to learn the data model before writing queries."
    )]
    async fn get_schema(&self) -> Result<CallToolResult, McpError> {
        Ok(self.dispatch(ToolCall::GetSchema).await.into_call_result())
    }

    #[tool(
        description = "Execute a SQL query and return columns and rows.\nOnly read-only statements (SELECT, WITH, EXPLAIN, SHOW) are accepted unless the server allows writes.\nDatabase errors are returned with the driver's message so the query can be corrected."
    )]
    async fn run_query(
        &self,
        Parameters(input): Parameters<RunQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.dispatch(ToolCall::RunQuery(input)).await.into_call_result())
    }

    #[tool(
        description = "List active factories with location, size, and counts of production lines and machines.\nOptionally filter by factory_id."
    )]
    async fn list_factories(
        &self,
        Parameters(input): Parameters<ListFactoriesInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::ListFactories(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "List machines with production line, factory, status, age, and cumulative downtime, worst downtime first.\nFilter by status (operational, maintenance, offline) or factory_id."
    )]
    async fn get_machines(
        &self,
        Parameters(input): Parameters<GetMachinesInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::GetMachines(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "List recent work orders with operator, production line, factory, and completion percentage.\nFilter by status, priority, or factory_id. limit: 1-100, default 20."
    )]
    async fn get_work_orders(
        &self,
        Parameters(input): Parameters<GetWorkOrdersInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::GetWorkOrders(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "Summarize quality inspections by factory, result, and defect type, with totals per result and the pass rate.\nFilter by result, factory_id, or an inspection date range (YYYY-MM-DD)."
    )]
    async fn quality_summary(
        &self,
        Parameters(input): Parameters<QualitySummaryInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::QualitySummary(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "List maintenance events with machine, factory, technician, downtime, and cost, newest first, plus downtime and cost totals.\nFilter by machine_id, factory_id, maintenance_type, or a date range (YYYY-MM-DD)."
    )]
    async fn maintenance_report(
        &self,
        Parameters(input): Parameters<MaintenanceReportInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::MaintenanceReport(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "Show parts inventory with stock levels, reorder thresholds, supplier, and open purchase orders.\nParts below their reorder threshold are flagged LOW STOCK and listed first; set low_stock_only to list only those."
    )]
    async fn inventory_status(
        &self,
        Parameters(input): Parameters<InventoryStatusInput>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::InventoryStatus(input))
            .await
            .into_call_result())
    }

    #[tool(
        description = "Rate suppliers: purchase order counts by status, average delivery delay in days, lead time, and reliability score."
    )]
    async fn supplier_performance(&self) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::SupplierPerformance)
            .await
            .into_call_result())
    }

    #[tool(
        description = "Rank operators by work order completion rate, then by fewest defects found on their work orders."
    )]
    async fn operator_performance(&self) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatch(ToolCall::OperatorPerformance)
            .await
            .into_call_result())
    }
}

impl ServerHandler for ManufacturingService {
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(JsonValue::Object);
        Ok(self.invoke(&request.name, arguments).await.into_call_result())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("Manufacturing MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for exploring a manufacturing database: factories, production lines, \
                machines, employees, suppliers, parts, purchase orders, work orders, quality \
                inspections and maintenance logs.\n\
                \n\
                ## Workflow\n\
                1. Call `get_schema` first to learn tables, columns and relationships\n\
                2. Use the report tools for common questions (`list_factories`, `get_machines`, \
                `get_work_orders`, `quality_summary`, `maintenance_report`, `inventory_status`, \
                `supplier_performance`, `operator_performance`)\n\
                3. Use `run_query` for anything else\n\
                \n\
                ## Responses\n\
                Every tool returns a JSON envelope with `status` \"ok\" and `data`, or \
                `status` \"error\" with `error_type`, `message` and `suggestion`. A \
                `QueryError` carries the database's own message; fix the SQL and retry."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ResolverSettings;
    use crate::error::ErrorKind;

    fn create_test_service() -> ManufacturingService {
        let resolver = Arc::new(ConnectionResolver::new(
            None,
            "never-created.db",
            ResolverSettings::default(),
        ));
        ManufacturingService::new(resolver, QueryExecutor::new(), false)
    }

    #[test]
    fn test_catalog_matches_registered_tools() {
        let service = create_test_service();
        service.verify_catalog().unwrap();
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "manufacturing-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("get_schema"));
    }

    fn route<F>(_handler: F)
    where
        F: for<'a> Fn(&'a ManufacturingService) -> BoxFuture<'a, Result<CallToolResult, McpError>>,
    {
    }

    // Same shape the router stores: the future must be Send for any borrow.
    #[test]
    fn test_tool_futures_are_send_for_any_borrow() {
        route(|service| service.get_schema().boxed());
        route(|service| service.supplier_performance().boxed());
        route(|service| {
            let input = RunQueryInput {
                sql: "SELECT 1".to_string(),
                limit: None,
            };
            service.run_query(Parameters(input)).boxed()
        });
        route(|service| {
            service
                .quality_summary(Parameters(QualitySummaryInput::default()))
                .boxed()
        });
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_connect() {
        let service = create_test_service();
        let response = service.invoke("launch_rockets", None).await;
        assert_eq!(response.error_type(), Some(ErrorKind::UnknownToolError));
        assert_eq!(response.tool(), "launch_rockets");
        assert!(!service.resolver().is_connected());
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_connect() {
        let service = create_test_service();
        let response = service
            .invoke(
                "get_work_orders",
                Some(serde_json::json!({"limit": 500})),
            )
            .await;
        assert_eq!(response.error_type(), Some(ErrorKind::ValidationError));
        assert!(!service.resolver().is_connected());
    }
}
