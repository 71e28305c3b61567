//! Integration tests for the manufacturing report tools.
//!
//! Tests verify that:
//! - Each report returns exactly its declared columns
//! - Filters that match nothing return an empty result, not an error
//! - Filters narrow the result to matching rows

use manufacturing_mcp_server::db::{ConnectionResolver, QueryExecutor, ResolverSettings};
use manufacturing_mcp_server::mcp::{ManufacturingService, ToolResponse};
use manufacturing_mcp_server::tools::reports::columns;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

fn setup_service(dir: &TempDir) -> ManufacturingService {
    let resolver = Arc::new(ConnectionResolver::new(
        None,
        dir.path().join("manufacturing.db"),
        ResolverSettings::default(),
    ));
    ManufacturingService::new(resolver, QueryExecutor::new(), false)
}

fn data(response: &ToolResponse) -> &Value {
    match response.data() {
        Some(data) => data,
        None => panic!("expected ok envelope, got {}", response.to_json()),
    }
}

fn column_names(data: &Value) -> Vec<&str> {
    data["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect()
}

fn assert_row_keys(data: &Value, expected: &[&str]) {
    for row in data["rows"].as_array().unwrap() {
        let keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
    }
}

#[tokio::test]
async fn test_reports_return_declared_columns() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let cases: [(&str, &[&str]); 8] = [
        ("list_factories", columns::LIST_FACTORIES),
        ("get_machines", columns::GET_MACHINES),
        ("get_work_orders", columns::GET_WORK_ORDERS),
        ("quality_summary", columns::QUALITY_SUMMARY),
        ("maintenance_report", columns::MAINTENANCE_REPORT),
        ("inventory_status", columns::INVENTORY_STATUS),
        ("supplier_performance", columns::SUPPLIER_PERFORMANCE),
        ("operator_performance", columns::OPERATOR_PERFORMANCE),
    ];

    for (tool, expected) in cases {
        let response = service.invoke(tool, None).await;
        let data = data(&response);
        assert_eq!(column_names(data), expected, "tool: {}", tool);
        assert!(data["row_count"].as_u64().unwrap() > 0, "tool: {}", tool);
        assert_row_keys(data, expected);
    }
}

#[tokio::test]
async fn test_nonexistent_filters_return_empty_results() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let cases = [
        ("list_factories", json!({"factory_id": 999})),
        ("get_machines", json!({"factory_id": 999})),
        ("get_work_orders", json!({"factory_id": 999})),
        ("quality_summary", json!({"factory_id": 999})),
        ("maintenance_report", json!({"machine_id": 999})),
        (
            "quality_summary",
            json!({"start_date": "1990-01-01", "end_date": "1990-12-31"}),
        ),
    ];

    for (tool, args) in cases {
        let response = service.invoke(tool, Some(args.clone())).await;
        let data = data(&response);
        assert_eq!(data["row_count"], 0, "{} {}", tool, args);
        assert!(!column_names(data).is_empty(), "{} {}", tool, args);
    }
}

#[tokio::test]
async fn test_get_machines_status_filter() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let response = service
        .invoke("get_machines", Some(json!({"status": "maintenance"})))
        .await;
    let data = data(&response);
    for row in data["rows"].as_array().unwrap() {
        assert_eq!(row["status"], "maintenance");
    }
}

#[tokio::test]
async fn test_get_work_orders_limit_and_status() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let response = service
        .invoke(
            "get_work_orders",
            Some(json!({"status": "completed", "limit": 7})),
        )
        .await;
    let data = data(&response);
    assert!(data["row_count"].as_u64().unwrap() <= 7);
    for row in data["rows"].as_array().unwrap() {
        assert_eq!(row["status"], "completed");
    }
}

#[tokio::test]
async fn test_quality_summary_includes_totals() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let response = service.invoke("quality_summary", None).await;
    let data = data(&response);
    let summary = &data["summary"];
    assert_eq!(summary["total_inspections"], 500);
    assert!(summary["by_result"].is_object());
}

#[tokio::test]
async fn test_inventory_lists_low_stock_first() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let response = service.invoke("inventory_status", None).await;
    let rows = data(&response)["rows"].as_array().unwrap().clone();
    let first_ok = rows
        .iter()
        .position(|r| r["stock_status"] != "LOW STOCK")
        .unwrap_or(rows.len());
    assert!(rows[first_ok..].iter().all(|r| r["stock_status"] != "LOW STOCK"));

    let response = service
        .invoke("inventory_status", Some(json!({"low_stock_only": true})))
        .await;
    for row in data(&response)["rows"].as_array().unwrap() {
        assert_eq!(row["stock_status"], "LOW STOCK");
    }
}

#[tokio::test]
async fn test_maintenance_type_filter() {
    let dir = TempDir::new().unwrap();
    let service = setup_service(&dir);

    let response = service
        .invoke(
            "maintenance_report",
            Some(json!({"maintenance_type": "emergency", "limit": 100})),
        )
        .await;
    let data = data(&response);
    for row in data["rows"].as_array().unwrap() {
        assert_eq!(row["maintenance_type"], "emergency");
    }
    assert!(data["summary"]["events"].as_u64().is_some());
}
