//! Convenience report tools over the manufacturing schema.
//!
//! Each tool takes a typed filter struct, validates it before touching the
//! database, appends the filters to a fixed SQL template as bound parameters
//! and reports a fixed column list. A filter that matches nothing returns an
//! empty result.

use crate::db::{ConnectionResolver, DbHandle, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, QueryParam, QueryRequest, QueryResult};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tracing::debug;

/// Default row count for tools that take a `limit`.
pub const DEFAULT_REPORT_LIMIT: u32 = 20;

/// Largest `limit` a report tool accepts.
pub const MAX_REPORT_LIMIT: u32 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn default_limit() -> u32 {
    DEFAULT_REPORT_LIMIT
}

macro_rules! filter_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }
    };
}

filter_enum!(
    /// Machine operating status.
    MachineStatus {
        Operational => "operational",
        Maintenance => "maintenance",
        Offline => "offline",
    }
);

filter_enum!(
    /// Work order lifecycle status.
    WorkOrderStatus {
        Planned => "planned",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

filter_enum!(
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
);

filter_enum!(
    /// Outcome of a quality inspection.
    InspectionResult {
        Pass => "pass",
        Fail => "fail",
        ConditionalPass => "conditional_pass",
    }
);

filter_enum!(
    MaintenanceType {
        Preventive => "preventive",
        Corrective => "corrective",
        Emergency => "emergency",
    }
);

// =============================================================================
// Inputs
// =============================================================================

/// Input for the list_factories tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListFactoriesInput {
    /// Only report this factory
    #[serde(default)]
    pub factory_id: Option<i64>,
}

/// Input for the get_machines tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetMachinesInput {
    /// Filter by status: operational, maintenance or offline
    #[serde(default)]
    pub status: Option<MachineStatus>,
    /// Filter by factory ID
    #[serde(default)]
    pub factory_id: Option<i64>,
}

/// Input for the get_work_orders tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetWorkOrdersInput {
    /// Filter by status: planned, in_progress, completed or cancelled
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    /// Filter by priority: low, medium, high or critical
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Filter by factory ID
    #[serde(default)]
    pub factory_id: Option<i64>,
    /// Maximum rows to return (1-100). Default: 20
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for GetWorkOrdersInput {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            factory_id: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

/// Input for the quality_summary tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QualitySummaryInput {
    /// Filter by result: pass, fail or conditional_pass
    #[serde(default)]
    pub result: Option<InspectionResult>,
    /// Filter by factory ID
    #[serde(default)]
    pub factory_id: Option<i64>,
    /// Earliest inspection date (YYYY-MM-DD)
    #[serde(default)]
    pub start_date: Option<String>,
    /// Latest inspection date (YYYY-MM-DD)
    #[serde(default)]
    pub end_date: Option<String>,
    /// Maximum rows to return (1-100). Default: 20
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for QualitySummaryInput {
    fn default() -> Self {
        Self {
            result: None,
            factory_id: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

/// Input for the maintenance_report tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceReportInput {
    /// Filter by machine ID
    #[serde(default)]
    pub machine_id: Option<i64>,
    /// Filter by factory ID
    #[serde(default)]
    pub factory_id: Option<i64>,
    /// Filter by type: preventive, corrective or emergency
    #[serde(default)]
    pub maintenance_type: Option<MaintenanceType>,
    /// Earliest maintenance date (YYYY-MM-DD)
    #[serde(default)]
    pub start_date: Option<String>,
    /// Latest maintenance date (YYYY-MM-DD)
    #[serde(default)]
    pub end_date: Option<String>,
    /// Maximum rows to return (1-100). Default: 20
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for MaintenanceReportInput {
    fn default() -> Self {
        Self {
            machine_id: None,
            factory_id: None,
            maintenance_type: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

/// Input for the inventory_status tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InventoryStatusInput {
    /// Only list parts below their reorder threshold. Default: false
    #[serde(default)]
    pub low_stock_only: bool,
}

fn check_id(field: &str, value: Option<i64>) -> DbResult<()> {
    match value {
        Some(id) if id <= 0 => Err(DbError::validation(format!(
            "{} must be a positive integer, got {}",
            field, id
        ))),
        _ => Ok(()),
    }
}

fn check_limit(limit: u32) -> DbResult<()> {
    if limit == 0 || limit > MAX_REPORT_LIMIT {
        return Err(DbError::validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_REPORT_LIMIT, limit
        )));
    }
    Ok(())
}

fn parse_date(field: &str, value: &str) -> DbResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        DbError::validation(format!("{} must be a date in YYYY-MM-DD form, got '{}'", field, value))
    })
}

fn check_date_range(start: Option<&str>, end: Option<&str>) -> DbResult<()> {
    let start = start.map(|s| parse_date("start_date", s)).transpose()?;
    let end = end.map(|s| parse_date("end_date", s)).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(DbError::validation(format!(
                "start_date {} is after end_date {}",
                start, end
            )));
        }
    }
    Ok(())
}

impl ListFactoriesInput {
    pub fn validate(&self) -> DbResult<()> {
        check_id("factory_id", self.factory_id)
    }
}

impl GetMachinesInput {
    pub fn validate(&self) -> DbResult<()> {
        check_id("factory_id", self.factory_id)
    }
}

impl GetWorkOrdersInput {
    pub fn validate(&self) -> DbResult<()> {
        check_id("factory_id", self.factory_id)?;
        check_limit(self.limit)
    }
}

impl QualitySummaryInput {
    pub fn validate(&self) -> DbResult<()> {
        check_id("factory_id", self.factory_id)?;
        check_limit(self.limit)?;
        check_date_range(self.start_date.as_deref(), self.end_date.as_deref())
    }

    /// `base` with this input's filters appended. The detail and totals
    /// queries share it so both see the same rows.
    fn filtered(&self, db_type: DatabaseType, base: &str) -> SqlTemplate {
        let mut sql = SqlTemplate::new(db_type, base);
        if let Some(result) = self.result {
            sql.and_eq("qi.result", result.as_str());
        }
        if let Some(id) = self.factory_id {
            sql.and_eq("f.id", id);
        }
        if let Some(start) = self.start_date.as_deref() {
            sql.and_date("qi.inspection_date", ">=", start);
        }
        if let Some(end) = self.end_date.as_deref() {
            sql.and_date("qi.inspection_date", "<=", end);
        }
        sql
    }
}

impl MaintenanceReportInput {
    pub fn validate(&self) -> DbResult<()> {
        check_id("machine_id", self.machine_id)?;
        check_id("factory_id", self.factory_id)?;
        check_limit(self.limit)?;
        check_date_range(self.start_date.as_deref(), self.end_date.as_deref())
    }

    fn filtered(&self, db_type: DatabaseType, base: &str) -> SqlTemplate {
        let mut sql = SqlTemplate::new(db_type, base);
        if let Some(id) = self.machine_id {
            sql.and_eq("ml.machine_id", id);
        }
        if let Some(id) = self.factory_id {
            sql.and_eq("f.id", id);
        }
        if let Some(kind) = self.maintenance_type {
            sql.and_eq("ml.maintenance_type", kind.as_str());
        }
        if let Some(start) = self.start_date.as_deref() {
            sql.and_date("ml.maintenance_date", ">=", start);
        }
        if let Some(end) = self.end_date.as_deref() {
            sql.and_date("ml.maintenance_date", "<=", end);
        }
        sql
    }
}

// =============================================================================
// SQL templates
// =============================================================================

/// SQL text with bound parameters in the placeholder style of one driver family.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    db_type: DatabaseType,
    sql: String,
    params: Vec<QueryParam>,
}

impl SqlTemplate {
    pub fn new(db_type: DatabaseType, base: &str) -> Self {
        Self {
            db_type,
            sql: base.trim_end().to_string(),
            params: Vec::new(),
        }
    }

    fn bind(&mut self, param: impl Into<QueryParam>) -> String {
        self.params.push(param.into());
        self.db_type.placeholder(self.params.len())
    }

    /// Append raw SQL text.
    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push(' ');
        self.sql.push_str(text.trim());
        self
    }

    /// Append `AND column = <param>`.
    pub fn and_eq(&mut self, column: &str, value: impl Into<QueryParam>) -> &mut Self {
        let placeholder = self.bind(value);
        self.push(&format!("AND {} = {}", column, placeholder))
    }

    /// Append a date comparison against a `YYYY-MM-DD` value.
    ///
    /// SQLite stores dates as ISO text, so plain text comparison orders them.
    /// Server databases may hold DATE or text columns; both sides are cast.
    pub fn and_date(&mut self, column: &str, op: &str, date: &str) -> &mut Self {
        let placeholder = self.bind(date);
        let clause = match self.db_type {
            DatabaseType::SQLite => format!("AND {} {} {}", column, op, placeholder),
            _ => format!(
                "AND CAST({} AS DATE) {} CAST({} AS DATE)",
                column, op, placeholder
            ),
        };
        self.push(&clause)
    }

    /// Append `LIMIT <param>`.
    pub fn limit(&mut self, limit: u32) -> &mut Self {
        let placeholder = self.bind(i64::from(limit));
        self.push(&format!("LIMIT {}", placeholder))
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    pub fn into_request(self) -> QueryRequest {
        QueryRequest::new(self.sql).with_params(self.params)
    }
}

/// Days between two date columns, in the family's dialect.
fn days_between(db_type: DatabaseType, later: &str, earlier: &str) -> String {
    match db_type {
        DatabaseType::SQLite => format!("julianday({}) - julianday({})", later, earlier),
        DatabaseType::PostgreSQL => {
            format!("CAST({} AS DATE) - CAST({} AS DATE)", later, earlier)
        }
        DatabaseType::MySQL | DatabaseType::MariaDB => {
            format!("DATEDIFF({}, {})", later, earlier)
        }
    }
}

pub mod columns {
    pub const LIST_FACTORIES: &[&str] = &[
        "id",
        "name",
        "location",
        "country",
        "established_year",
        "total_area_sqm",
        "production_lines",
        "machines",
    ];

    pub const GET_MACHINES: &[&str] = &[
        "id",
        "name",
        "model",
        "manufacturer",
        "status",
        "age_years",
        "cumulative_downtime_hours",
        "last_maintenance_date",
        "production_line",
        "factory",
    ];

    pub const GET_WORK_ORDERS: &[&str] = &[
        "id",
        "product_name",
        "status",
        "priority",
        "quantity_target",
        "quantity_produced",
        "completion_pct",
        "start_date",
        "end_date",
        "operator",
        "production_line",
        "factory",
    ];

    pub const QUALITY_SUMMARY: &[&str] =
        &["factory", "result", "count", "total_defects", "defect_type"];

    pub const MAINTENANCE_REPORT: &[&str] = &[
        "id",
        "maintenance_date",
        "maintenance_type",
        "downtime_hours",
        "cost",
        "description",
        "resolved",
        "machine",
        "machine_status",
        "factory",
        "technician",
    ];

    pub const INVENTORY_STATUS: &[&str] = &[
        "id",
        "name",
        "sku",
        "category",
        "stock_quantity",
        "reorder_threshold",
        "stock_status",
        "unit_cost",
        "supplier",
        "lead_time_days",
        "reliability_score",
        "open_purchase_orders",
    ];

    pub const SUPPLIER_PERFORMANCE: &[&str] = &[
        "supplier",
        "country",
        "reliability_score",
        "lead_time_days",
        "total_orders",
        "delivered",
        "pending",
        "cancelled",
        "avg_delay_days",
    ];

    pub const OPERATOR_PERFORMANCE: &[&str] = &[
        "operator",
        "shift",
        "factory",
        "total_work_orders",
        "completed",
        "completion_rate_pct",
        "total_defects",
        "failed_inspections",
    ];
}

mod queries {
    pub const LIST_FACTORIES: &str = r#"
        SELECT f.id, f.name, f.location, f.country, f.established_year, f.total_area_sqm,
               COUNT(DISTINCT pl.id) AS production_lines,
               COUNT(DISTINCT m.id) AS machines
        FROM factories f
        LEFT JOIN production_lines pl ON pl.factory_id = f.id
        LEFT JOIN machines m ON m.production_line_id = pl.id
        WHERE f.active = TRUE
    "#;

    pub const GET_MACHINES: &str = r#"
        SELECT m.id, m.name, m.model, m.manufacturer, m.status,
               m.age_years, m.cumulative_downtime_hours, m.last_maintenance_date,
               pl.name AS production_line, f.name AS factory
        FROM machines m
        JOIN production_lines pl ON pl.id = m.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        WHERE 1 = 1
    "#;

    pub const GET_WORK_ORDERS: &str = r#"
        SELECT wo.id, wo.product_name, wo.status, wo.priority,
               wo.quantity_target, wo.quantity_produced,
               ROUND(100.0 * wo.quantity_produced / wo.quantity_target, 1) AS completion_pct,
               wo.start_date, wo.end_date,
               e.name AS operator, pl.name AS production_line, f.name AS factory
        FROM work_orders wo
        JOIN employees e ON e.id = wo.operator_id
        JOIN production_lines pl ON pl.id = wo.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        WHERE 1 = 1
    "#;

    pub const QUALITY_SUMMARY: &str = r#"
        SELECT f.name AS factory, qi.result,
               COUNT(*) AS count,
               SUM(qi.defect_count) AS total_defects,
               qi.defect_type
        FROM quality_inspections qi
        JOIN work_orders wo ON wo.id = qi.work_order_id
        JOIN production_lines pl ON pl.id = wo.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        WHERE 1 = 1
    "#;

    pub const QUALITY_TOTALS: &str = r#"
        SELECT qi.result AS result,
               COUNT(*) AS count,
               COALESCE(SUM(qi.defect_count), 0) AS total_defects
        FROM quality_inspections qi
        JOIN work_orders wo ON wo.id = qi.work_order_id
        JOIN production_lines pl ON pl.id = wo.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        WHERE 1 = 1
    "#;

    pub const MAINTENANCE_REPORT: &str = r#"
        SELECT ml.id, ml.maintenance_date, ml.maintenance_type,
               ml.downtime_hours, ml.cost, ml.description, ml.resolved,
               m.name AS machine, m.status AS machine_status,
               f.name AS factory, e.name AS technician
        FROM maintenance_logs ml
        JOIN machines m ON m.id = ml.machine_id
        JOIN production_lines pl ON pl.id = m.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        JOIN employees e ON e.id = ml.technician_id
        WHERE 1 = 1
    "#;

    pub const MAINTENANCE_TOTALS: &str = r#"
        SELECT COUNT(*) AS events,
               COALESCE(SUM(ml.downtime_hours), 0) AS total_downtime_hours,
               COALESCE(SUM(ml.cost), 0) AS total_cost,
               COALESCE(SUM(CASE WHEN ml.resolved = TRUE THEN 0 ELSE 1 END), 0) AS unresolved
        FROM maintenance_logs ml
        JOIN machines m ON m.id = ml.machine_id
        JOIN production_lines pl ON pl.id = m.production_line_id
        JOIN factories f ON f.id = pl.factory_id
        JOIN employees e ON e.id = ml.technician_id
        WHERE 1 = 1
    "#;

    pub const INVENTORY_STATUS: &str = r#"
        SELECT p.id, p.name, p.sku, p.category, p.stock_quantity, p.reorder_threshold,
               CASE WHEN p.stock_quantity < p.reorder_threshold THEN 'LOW STOCK' ELSE 'OK' END AS stock_status,
               p.unit_cost,
               s.name AS supplier, s.lead_time_days, s.reliability_score,
               COUNT(po.id) AS open_purchase_orders
        FROM parts p
        LEFT JOIN suppliers s ON s.id = p.supplier_id
        LEFT JOIN purchase_orders po ON po.part_id = p.id AND po.status IN ('pending', 'shipped')
        WHERE 1 = 1
    "#;

    pub const INVENTORY_ORDER: &str = r#"
        GROUP BY p.id, s.id
        ORDER BY CASE WHEN p.stock_quantity < p.reorder_threshold THEN 0 ELSE 1 END,
                 p.stock_quantity ASC
    "#;

    pub const OPERATOR_PERFORMANCE: &str = r#"
        SELECT e.name AS operator, e.shift, f.name AS factory,
               COUNT(DISTINCT wo.id) AS total_work_orders,
               COUNT(DISTINCT CASE WHEN wo.status = 'completed' THEN wo.id END) AS completed,
               ROUND(100.0 * COUNT(DISTINCT CASE WHEN wo.status = 'completed' THEN wo.id END)
                     / COUNT(DISTINCT wo.id), 1) AS completion_rate_pct,
               COALESCE(SUM(qi.defect_count), 0) AS total_defects,
               COUNT(DISTINCT CASE WHEN qi.result = 'fail' THEN qi.id END) AS failed_inspections
        FROM employees e
        JOIN factories f ON f.id = e.factory_id
        LEFT JOIN work_orders wo ON wo.operator_id = e.id
        LEFT JOIN quality_inspections qi ON qi.work_order_id = wo.id
        WHERE e.active = TRUE
        GROUP BY e.id, f.id
        HAVING COUNT(DISTINCT wo.id) > 0
        ORDER BY completion_rate_pct DESC, total_defects ASC
    "#;
}

fn supplier_performance_sql(db_type: DatabaseType) -> String {
    format!(
        r#"
        SELECT s.name AS supplier, s.country, s.reliability_score, s.lead_time_days,
               COUNT(po.id) AS total_orders,
               SUM(CASE WHEN po.status = 'delivered' THEN 1 ELSE 0 END) AS delivered,
               SUM(CASE WHEN po.status = 'pending' THEN 1 ELSE 0 END) AS pending,
               SUM(CASE WHEN po.status = 'cancelled' THEN 1 ELSE 0 END) AS cancelled,
               ROUND(AVG(
                   CASE WHEN po.actual_delivery IS NOT NULL AND po.expected_delivery IS NOT NULL
                   THEN {}
                   ELSE NULL END
               ), 1) AS avg_delay_days
        FROM suppliers s
        LEFT JOIN purchase_orders po ON po.supplier_id = s.id
        GROUP BY s.id
        ORDER BY s.reliability_score DESC
        "#,
        days_between(db_type, "po.actual_delivery", "po.expected_delivery")
    )
}

// =============================================================================
// Output
// =============================================================================

/// Rows of a report plus optional aggregate figures.
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    #[serde(flatten)]
    pub result: QueryResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JsonValue>,
}

impl From<QueryResult> for ReportOutput {
    fn from(result: QueryResult) -> Self {
        Self {
            result,
            summary: None,
        }
    }
}

/// Read a numeric cell that may arrive as a JSON number or a decimal string.
fn number(value: Option<&JsonValue>) -> f64 {
    match value {
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Totals per inspection result and the overall pass rate.
fn quality_summary(totals: &QueryResult) -> JsonValue {
    let mut by_result = serde_json::Map::new();
    let mut inspections = 0.0;
    let mut defects = 0.0;
    let mut passed = 0.0;

    for row in &totals.rows {
        let result = row
            .get("result")
            .and_then(JsonValue::as_str)
            .unwrap_or("unknown")
            .to_string();
        let count = number(row.get("count"));
        inspections += count;
        defects += number(row.get("total_defects"));
        if result == InspectionResult::Pass.as_str() {
            passed += count;
        }
        by_result.insert(result, json!(count as i64));
    }

    let pass_rate_pct = (inspections > 0.0).then(|| round1(100.0 * passed / inspections));
    json!({
        "total_inspections": inspections as i64,
        "total_defects": defects as i64,
        "by_result": by_result,
        "pass_rate_pct": pass_rate_pct,
    })
}

/// Event count, downtime and cost totals for the filtered maintenance logs.
fn maintenance_summary(totals: &QueryResult) -> JsonValue {
    let row = totals.rows.first();
    let get = |key: &str| number(row.and_then(|r| r.get(key)));
    json!({
        "events": get("events") as i64,
        "total_downtime_hours": round1(get("total_downtime_hours")),
        "total_cost": (get("total_cost") * 100.0).round() / 100.0,
        "unresolved": get("unresolved") as i64,
    })
}

// =============================================================================
// Handler
// =============================================================================

/// Handler for the convenience report tools.
pub struct ReportToolHandler {
    resolver: Arc<ConnectionResolver>,
    executor: QueryExecutor,
}

impl ReportToolHandler {
    pub fn new(resolver: Arc<ConnectionResolver>, executor: QueryExecutor) -> Self {
        Self { resolver, executor }
    }

    async fn run(
        &self,
        handle: &DbHandle,
        template: SqlTemplate,
        columns: &[&str],
    ) -> DbResult<QueryResult> {
        debug!(sql = %template.sql(), params = template.params().len(), "Running report query");
        let request = template.into_request();
        let mut result = self.executor.execute(handle, &request).await?;
        result.columns = columns.iter().map(|c| c.to_string()).collect();
        Ok(result)
    }

    /// Factories with production line and machine counts.
    pub async fn list_factories(&self, input: ListFactoriesInput) -> DbResult<ReportOutput> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        let mut sql = SqlTemplate::new(handle.db_type(), queries::LIST_FACTORIES);
        if let Some(id) = input.factory_id {
            sql.and_eq("f.id", id);
        }
        sql.push("GROUP BY f.id ORDER BY f.name");

        self.run(&handle, sql, columns::LIST_FACTORIES)
            .await
            .map(ReportOutput::from)
    }

    /// Machines with line, factory, status and downtime, worst downtime first.
    pub async fn get_machines(&self, input: GetMachinesInput) -> DbResult<ReportOutput> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        let mut sql = SqlTemplate::new(handle.db_type(), queries::GET_MACHINES);
        if let Some(status) = input.status {
            sql.and_eq("m.status", status.as_str());
        }
        if let Some(id) = input.factory_id {
            sql.and_eq("f.id", id);
        }
        sql.push("ORDER BY m.cumulative_downtime_hours DESC");

        self.run(&handle, sql, columns::GET_MACHINES)
            .await
            .map(ReportOutput::from)
    }

    /// Most recent work orders with completion percentage.
    pub async fn get_work_orders(&self, input: GetWorkOrdersInput) -> DbResult<ReportOutput> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        let mut sql = SqlTemplate::new(handle.db_type(), queries::GET_WORK_ORDERS);
        if let Some(status) = input.status {
            sql.and_eq("wo.status", status.as_str());
        }
        if let Some(priority) = input.priority {
            sql.and_eq("wo.priority", priority.as_str());
        }
        if let Some(id) = input.factory_id {
            sql.and_eq("f.id", id);
        }
        sql.push("ORDER BY wo.start_date DESC").limit(input.limit);

        self.run(&handle, sql, columns::GET_WORK_ORDERS)
            .await
            .map(ReportOutput::from)
    }

    /// Inspection outcomes grouped by factory, result and defect type.
    pub async fn quality_summary(&self, input: QualitySummaryInput) -> DbResult<ReportOutput> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        let db_type = handle.db_type();

        let mut sql = input.filtered(db_type, queries::QUALITY_SUMMARY);
        sql.push("GROUP BY f.name, qi.result, qi.defect_type ORDER BY total_defects DESC, count DESC")
            .limit(input.limit);
        let result = self.run(&handle, sql, columns::QUALITY_SUMMARY).await?;

        let mut totals = input.filtered(db_type, queries::QUALITY_TOTALS);
        totals.push("GROUP BY qi.result");
        let totals = self
            .run(&handle, totals, &["result", "count", "total_defects"])
            .await?;

        Ok(ReportOutput {
            result,
            summary: Some(quality_summary(&totals)),
        })
    }

    /// Maintenance events with downtime and cost, newest first.
    pub async fn maintenance_report(
        &self,
        input: MaintenanceReportInput,
    ) -> DbResult<ReportOutput> {
        input.validate()?;
        let handle = self.resolver.resolve().await?;

        let db_type = handle.db_type();

        let mut sql = input.filtered(db_type, queries::MAINTENANCE_REPORT);
        sql.push("ORDER BY ml.maintenance_date DESC").limit(input.limit);
        let result = self.run(&handle, sql, columns::MAINTENANCE_REPORT).await?;

        let totals = input.filtered(db_type, queries::MAINTENANCE_TOTALS);
        let totals = self
            .run(
                &handle,
                totals,
                &["events", "total_downtime_hours", "total_cost", "unresolved"],
            )
            .await?;

        Ok(ReportOutput {
            result,
            summary: Some(maintenance_summary(&totals)),
        })
    }

    /// Parts inventory, parts below their reorder threshold first.
    pub async fn inventory_status(&self, input: InventoryStatusInput) -> DbResult<ReportOutput> {
        let handle = self.resolver.resolve().await?;

        let mut sql = SqlTemplate::new(handle.db_type(), queries::INVENTORY_STATUS);
        if input.low_stock_only {
            sql.push("AND p.stock_quantity < p.reorder_threshold");
        }
        sql.push(queries::INVENTORY_ORDER);

        self.run(&handle, sql, columns::INVENTORY_STATUS)
            .await
            .map(ReportOutput::from)
    }

    /// Purchase order counts and average delivery delay per supplier.
    pub async fn supplier_performance(&self) -> DbResult<ReportOutput> {
        let handle = self.resolver.resolve().await?;
        let sql = SqlTemplate::new(handle.db_type(), &supplier_performance_sql(handle.db_type()));

        self.run(&handle, sql, columns::SUPPLIER_PERFORMANCE)
            .await
            .map(ReportOutput::from)
    }

    /// Operators ranked by completion rate, then by fewest defects.
    pub async fn operator_performance(&self) -> DbResult<ReportOutput> {
        let handle = self.resolver.resolve().await?;
        let sql = SqlTemplate::new(handle.db_type(), queries::OPERATOR_PERFORMANCE);

        self.run(&handle, sql, columns::OPERATOR_PERFORMANCE)
            .await
            .map(ReportOutput::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_template_sqlite_placeholders() {
        let mut sql = SqlTemplate::new(DatabaseType::SQLite, "SELECT * FROM machines m WHERE 1 = 1");
        sql.and_eq("m.status", "offline").and_eq("m.id", 3i64).limit(5);
        assert_eq!(
            sql.sql(),
            "SELECT * FROM machines m WHERE 1 = 1 AND m.status = ? AND m.id = ? LIMIT ?"
        );
        assert_eq!(
            sql.params(),
            &[
                QueryParam::String("offline".into()),
                QueryParam::Int(3),
                QueryParam::Int(5)
            ]
        );
    }

    #[test]
    fn test_template_postgres_numbers_placeholders() {
        let mut sql = SqlTemplate::new(DatabaseType::PostgreSQL, "SELECT 1 WHERE 1 = 1");
        sql.and_eq("a", 1i64).and_date("d", ">=", "2025-01-01").limit(10);
        assert_eq!(
            sql.sql(),
            "SELECT 1 WHERE 1 = 1 AND a = $1 AND CAST(d AS DATE) >= CAST($2 AS DATE) LIMIT $3"
        );
    }

    #[test]
    fn test_days_between_per_family() {
        assert!(days_between(DatabaseType::SQLite, "a", "b").contains("julianday"));
        assert!(days_between(DatabaseType::MariaDB, "a", "b").starts_with("DATEDIFF"));
        assert!(supplier_performance_sql(DatabaseType::PostgreSQL).contains("CAST(po.actual_delivery AS DATE)"));
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let input = ListFactoriesInput { factory_id: Some(0) };
        assert_eq!(input.validate().unwrap_err().kind(), ErrorKind::ValidationError);

        let input = MaintenanceReportInput {
            machine_id: Some(-4),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_limit_bounds() {
        let mut input = GetWorkOrdersInput::default();
        assert!(input.validate().is_ok());
        input.limit = 0;
        assert!(input.validate().is_err());
        input.limit = MAX_REPORT_LIMIT + 1;
        assert!(input.validate().is_err());
        input.limit = MAX_REPORT_LIMIT;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_date_validation() {
        let input = QualitySummaryInput {
            start_date: Some("2025-13-01".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = QualitySummaryInput {
            start_date: Some("2025-03-10".into()),
            end_date: Some("2025-03-01".into()),
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("after end_date"));

        let input = QualitySummaryInput {
            start_date: Some("2025-03-01".into()),
            end_date: Some("2025-03-01".into()),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_rejects_unknown_fields_and_bad_enum() {
        let err = serde_json::from_value::<GetMachinesInput>(json!({"colour": "red"}));
        assert!(err.is_err());
        let err = serde_json::from_value::<GetMachinesInput>(json!({"status": "exploded"}));
        assert!(err.is_err());
        let ok: GetWorkOrdersInput =
            serde_json::from_value(json!({"status": "in_progress", "priority": "critical"})).unwrap();
        assert_eq!(ok.status, Some(WorkOrderStatus::InProgress));
        assert_eq!(ok.limit, DEFAULT_REPORT_LIMIT);
    }

    #[test]
    fn test_summary_and_detail_share_filters() {
        let input = QualitySummaryInput {
            result: Some(InspectionResult::Fail),
            factory_id: Some(2),
            start_date: Some("2025-01-01".into()),
            ..Default::default()
        };
        let detail = input.filtered(DatabaseType::PostgreSQL, queries::QUALITY_SUMMARY);
        let totals = input.filtered(DatabaseType::PostgreSQL, queries::QUALITY_TOTALS);
        assert_eq!(detail.params(), totals.params());
        assert!(detail.sql().ends_with("AND CAST(qi.inspection_date AS DATE) >= CAST($3 AS DATE)"));
        assert!(totals.sql().contains("AND qi.result = $1 AND f.id = $2"));

        let input = MaintenanceReportInput {
            machine_id: Some(4),
            maintenance_type: Some(MaintenanceType::Emergency),
            end_date: Some("2025-06-30".into()),
            ..Default::default()
        };
        let detail = input.filtered(DatabaseType::SQLite, queries::MAINTENANCE_REPORT);
        let totals = input.filtered(DatabaseType::SQLite, queries::MAINTENANCE_TOTALS);
        assert_eq!(detail.params(), totals.params());
        assert_eq!(
            totals.params(),
            &[
                QueryParam::Int(4),
                QueryParam::String("emergency".into()),
                QueryParam::String("2025-06-30".into())
            ]
        );
    }

    #[test]
    fn test_quality_summary_totals() {
        let mut totals = QueryResult::new("", vec![], vec![], false, 0);
        for (result, count, defects) in [("pass", 7, 0), ("fail", 2, 9), ("conditional_pass", 1, 3)] {
            let mut row = serde_json::Map::new();
            row.insert("result".into(), json!(result));
            row.insert("count".into(), json!(count));
            row.insert("total_defects".into(), json!(defects));
            totals.rows.push(row);
        }
        let summary = quality_summary(&totals);
        assert_eq!(summary["total_inspections"], 10);
        assert_eq!(summary["total_defects"], 12);
        assert_eq!(summary["by_result"]["fail"], 2);
        assert_eq!(summary["pass_rate_pct"], 70.0);
    }

    #[test]
    fn test_quality_summary_empty_has_no_rate() {
        let totals = QueryResult::new("", vec![], vec![], false, 0);
        let summary = quality_summary(&totals);
        assert_eq!(summary["total_inspections"], 0);
        assert!(summary["pass_rate_pct"].is_null());
    }
}
