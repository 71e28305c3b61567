//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations.
//! Logs go to stderr so stdout carries only protocol messages.

use crate::error::{DbError, DbResult};
use crate::mcp::ManufacturingService;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout as newline-delimited JSON-RPC.
pub struct StdioTransport {
    service: ManufacturingService,
}

impl StdioTransport {
    pub fn new(service: ManufacturingService) -> Self {
        Self { service }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let running_service = self
            .service
            .clone()
            .serve(stdio())
            .await
            .map_err(|e| DbError::internal(format!("Failed to start stdio transport: {}", e)))?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        self.service.resolver().close().await;
                        return Err(DbError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.service.resolver().close().await;

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionResolver, QueryExecutor, ResolverSettings};
    use std::sync::Arc;

    #[test]
    fn test_stdio_transport_creation() {
        let resolver = Arc::new(ConnectionResolver::new(
            None,
            "unused.db",
            ResolverSettings::default(),
        ));
        let service = ManufacturingService::new(resolver, QueryExecutor::new(), false);
        let transport = StdioTransport::new(service);
        assert_eq!(transport.name(), "stdio");
    }
}
