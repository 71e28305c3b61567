//! Manufacturing MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query a manufacturing database (SQLite, PostgreSQL, MySQL, MariaDB).

use clap::Parser;
use manufacturing_mcp_server::config::{Config, TransportMode};
use manufacturing_mcp_server::db::{ConnectionResolver, QueryExecutor, ResolverSettings};
use manufacturing_mcp_server::mcp::ManufacturingService;
use manufacturing_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    if let Err(msg) = config.validate() {
        error!(error = %msg, "Invalid configuration");
        return Err(msg.into());
    }

    info!(
        transport = %config.transport,
        "Starting Manufacturing MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let resolver = Arc::new(ConnectionResolver::new(
        config.database_descriptor(),
        config.demo_db.clone(),
        ResolverSettings {
            connect_timeout: config.connect_timeout_duration(),
            allow_writes: config.allow_write_queries,
        },
    ));

    // The connection itself opens on the first tool call
    match resolver.target() {
        Ok(target) => info!(target = %target.describe(), "Database target configured"),
        Err(e) => warn!(error = %e, "Database target is invalid; tool calls will fail"),
    }

    let executor = QueryExecutor::with_defaults(config.query_timeout, config.max_rows);
    let service = ManufacturingService::new(resolver, executor, config.allow_write_queries);
    service.verify_catalog()?;

    if config.allow_write_queries {
        warn!("Write queries are enabled for run_query");
    }

    // Run the appropriate transport
    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(service);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
