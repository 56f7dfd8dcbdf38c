//! Centralized constants for the schema MCP server.
//!
//! Environment variable names and default values live here so the
//! configuration layer and the tools agree on them.

use std::time::Duration;

// =============================================================================
// Environment Variables
// =============================================================================

/// Server address (`host`, `host,port`, `host\instance`).
pub const ENV_SERVER: &str = "DB_SERVER";

/// Database name.
pub const ENV_DATABASE: &str = "DB_DATABASE";

/// SQL Server login name.
pub const ENV_USERNAME: &str = "DB_USERNAME";

/// SQL Server login password.
pub const ENV_PASSWORD: &str = "DB_PASSWORD";

/// Trust the server certificate without validation.
pub const ENV_TRUST_SERVER_CERTIFICATE: &str = "DB_TRUST_SERVER_CERTIFICATE";

/// Require TLS for the whole session, not only the login packet.
pub const ENV_ENCRYPT: &str = "DB_ENCRYPT";

/// ODBC driver name rendered into the connection string.
pub const ENV_ODBC_DRIVER: &str = "DB_ODBC_DRIVER";

/// Maximum accepted length of caller-supplied SELECT text.
pub const ENV_MAX_QUERY_LENGTH: &str = "DB_MAX_QUERY_LENGTH";

// =============================================================================
// Defaults
// =============================================================================

/// Default ODBC driver name.
pub const DEFAULT_ODBC_DRIVER: &str = "ODBC Driver 17 for SQL Server";

/// Default SQL Server port when the server address carries none.
pub const DEFAULT_PORT: u16 = 1433;

/// Default maximum query length (1MB).
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1_000_000;

/// Upper bound on resolving a named instance through the SQL Browser service.
pub const SQL_BROWSER_TIMEOUT: Duration = Duration::from_secs(5);

/// Application name reported to SQL Server.
pub const APPLICATION_NAME: &str = "mssql-schema-mcp";

/// Databases with an id at or below this value are the system databases
/// (master, tempdb, model, msdb).
pub const LAST_SYSTEM_DATABASE_ID: i32 = 4;

// =============================================================================
// Logging
// =============================================================================

/// Maximum number of characters of SQL text written to the log.
pub const LOG_QUERY_PREVIEW_LEN: usize = 200;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,mssql_schema_mcp=info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_database_cutoff() {
        assert_eq!(LAST_SYSTEM_DATABASE_ID, 4);
    }

    #[test]
    fn test_default_driver_is_odbc_17() {
        assert!(DEFAULT_ODBC_DRIVER.contains("17"));
    }
}
