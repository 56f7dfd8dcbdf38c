//! MSSQL Schema MCP Server entry point.
//!
//! This binary starts the MCP server using stdio transport for integration
//! with Claude Desktop, Cursor, and other MCP clients.

use anyhow::Result;
use mssql_schema_mcp::constants::DEFAULT_LOG_FILTER;
use mssql_schema_mcp::{Config, SchemaMcpServer};
use rmcp::ServiceExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is reserved for JSON-RPC)
    init_logging();

    let version = env!("CARGO_PKG_VERSION");
    info!("MSSQL Schema MCP Server v{} starting (transport: stdio)", version);

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        "Configuration loaded: server={:?} database={:?}",
        config.database.server, config.database.database
    );

    let server = SchemaMcpServer::new(config);

    // Start serving on stdio transport
    let transport = rmcp::transport::stdio();
    let service = server.serve(transport).await?;
    info!("Server initialized. Ready to accept requests...");

    tokio::select! {
        quit_reason = service.waiting() => {
            match quit_reason {
                Ok(reason) => info!("Service stopped: {:?}", reason),
                Err(e) => tracing::error!("Service error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with stderr output.
///
/// Logs MUST go to stderr because stdout is used for JSON-RPC communication.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
