//! ServerHandler implementation for the schema MCP server.
//!
//! This module implements the rmcp `ServerHandler` trait which defines how
//! the server responds to MCP protocol requests.

use crate::server::SchemaMcpServer;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::tool_handler;
use tracing::info;

/// The `#[tool_handler]` macro wires up tool routing automatically.
/// It generates the `list_tools` and `call_tool` method implementations.
#[tool_handler]
impl ServerHandler for SchemaMcpServer {
    /// Server identification - called during initialization handshake.
    fn get_info(&self) -> ServerInfo {
        info!("MCP client requesting server info");

        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                title: Some("SQL Server Schema MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(build_instructions(self)),
        }
    }
}

/// Build server instructions for the connected client.
fn build_instructions(server: &SchemaMcpServer) -> String {
    let mut instructions = String::new();

    instructions.push_str("# SQL Server Schema MCP Server\n\n");
    instructions.push_str("Read-only access to a Microsoft SQL Server instance.\n\n");

    match server.current_database() {
        Some(db) => instructions.push_str(&format!("**Configured database:** `{}`\n\n", db)),
        None => instructions.push_str("No database configured; the login's default database is used.\n\n"),
    }

    instructions.push_str("## Tools\n");
    instructions.push_str("- `get_databases`: list user databases (optional `filter`)\n");
    instructions.push_str("- `get_database_schema`: tables and columns (optional `tables`, `schemas`)\n");
    instructions.push_str("- `execute_select_query`: run one SELECT statement\n\n");

    instructions.push_str("## Notes\n");
    instructions.push_str("1. Only a single SELECT statement is accepted; batches and SELECT INTO are rejected\n");
    instructions.push_str("2. Pass values through `parameters` and reference them as `@name`\n");
    instructions.push_str(&format!(
        "3. Queries longer than {} bytes are rejected\n",
        server.validator().max_length()
    ));

    instructions
}
