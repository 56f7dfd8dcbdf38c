//! Configuration management for the schema MCP server.
//!
//! Configuration is loaded once at startup from environment variables following
//! the 12-factor app pattern. Nothing else in the crate reads the process
//! environment; components receive the resulting structs explicitly.

use crate::constants::{
    DEFAULT_MAX_QUERY_LENGTH, DEFAULT_ODBC_DRIVER, ENV_DATABASE, ENV_ENCRYPT,
    ENV_MAX_QUERY_LENGTH, ENV_ODBC_DRIVER, ENV_PASSWORD, ENV_SERVER,
    ENV_TRUST_SERVER_CERTIFICATE, ENV_USERNAME,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration
    pub database: DatabaseConfig,

    /// Query validation configuration
    pub security: SecurityConfig,
}

/// Database connection configuration.
///
/// Missing values are kept as empty strings; the driver rejects an
/// incomplete login when a tool actually connects.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server address (`host`, `host,port` or `host\instance`)
    pub server: String,

    /// Database name (`None` connects to the login's default database)
    pub database: Option<String>,

    /// SQL Server login
    pub username: String,

    /// SQL Server password
    #[serde(skip_serializing, default)]
    pub password: String,

    /// Trust server certificate (for self-signed certs)
    pub trust_server_certificate: bool,

    /// Encrypt the whole session instead of only the login packet
    pub encrypt: bool,

    /// ODBC driver name used when rendering a connection string
    pub odbc_driver: String,
}

/// Query validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum query length (bytes)
    pub max_query_length: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DB_SERVER`: Server address (default: empty)
    /// - `DB_DATABASE`: Database name (default: none)
    /// - `DB_USERNAME`: SQL login (default: empty)
    /// - `DB_PASSWORD`: SQL password (default: empty)
    /// - `DB_TRUST_SERVER_CERTIFICATE`: Trust server certificate (default: true)
    /// - `DB_ENCRYPT`: Encrypt the full session (default: false)
    /// - `DB_ODBC_DRIVER`: ODBC driver name (default: `ODBC Driver 17 for SQL Server`)
    /// - `DB_MAX_QUERY_LENGTH`: Maximum SELECT length in bytes (default: 1000000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = lookup(ENV_SERVER).unwrap_or_default();
        let database = lookup(ENV_DATABASE).filter(|d| !d.trim().is_empty());
        let username = lookup(ENV_USERNAME).unwrap_or_default();
        let password = lookup(ENV_PASSWORD).unwrap_or_default();

        let trust_server_certificate = lookup(ENV_TRUST_SERVER_CERTIFICATE)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        let encrypt = lookup(ENV_ENCRYPT)
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);

        let odbc_driver = lookup(ENV_ODBC_DRIVER)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_ODBC_DRIVER.to_string());

        let max_query_length = lookup(ENV_MAX_QUERY_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_QUERY_LENGTH);

        Config {
            database: DatabaseConfig {
                server,
                database,
                username,
                password,
                trust_server_certificate,
                encrypt,
                odbc_driver,
            },
            security: SecurityConfig { max_query_length },
        }
    }

    /// Get the configured database name, if any.
    pub fn current_database(&self) -> Option<&str> {
        self.database.database.as_deref()
    }
}

/// Parse a boolean-ish environment value.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("encrypt", &self.encrypt)
            .field("odbc_driver", &self.odbc_driver)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            database: None,
            username: String::new(),
            password: String::new(),
            trust_server_certificate: true,
            encrypt: false,
            odbc_driver: DEFAULT_ODBC_DRIVER.to_string(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_yields_empty_credentials() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.database.server, "");
        assert_eq!(config.database.username, "");
        assert_eq!(config.database.password, "");
        assert!(config.database.database.is_none());
        assert!(config.database.trust_server_certificate);
        assert!(!config.database.encrypt);
        assert_eq!(config.database.odbc_driver, DEFAULT_ODBC_DRIVER);
        assert_eq!(config.security.max_query_length, DEFAULT_MAX_QUERY_LENGTH);
    }

    #[test]
    fn test_values_are_read_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_SERVER", "sql01,1444"),
            ("DB_DATABASE", "Sales"),
            ("DB_USERNAME", "reporter"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_TRUST_SERVER_CERTIFICATE", "no"),
            ("DB_ENCRYPT", "1"),
            ("DB_ODBC_DRIVER", "ODBC Driver 18 for SQL Server"),
            ("DB_MAX_QUERY_LENGTH", "4096"),
        ]));

        assert_eq!(config.database.server, "sql01,1444");
        assert_eq!(config.current_database(), Some("Sales"));
        assert_eq!(config.database.username, "reporter");
        assert_eq!(config.database.password, "s3cret");
        assert!(!config.database.trust_server_certificate);
        assert!(config.database.encrypt);
        assert_eq!(config.database.odbc_driver, "ODBC Driver 18 for SQL Server");
        assert_eq!(config.security.max_query_length, 4096);
    }

    #[test]
    fn test_blank_database_means_none() {
        let config = Config::from_lookup(lookup_from(&[("DB_DATABASE", "  ")]));
        assert_eq!(config.current_database(), None);
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_ENCRYPT", "maybe"),
            ("DB_MAX_QUERY_LENGTH", "lots"),
        ]));
        assert!(!config.database.encrypt);
        assert_eq!(config.security.max_query_length, DEFAULT_MAX_QUERY_LENGTH);
    }

    #[test]
    fn test_debug_hides_password() {
        let config = Config::from_lookup(lookup_from(&[("DB_PASSWORD", "hunter2")]));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_serialized_config_omits_password() {
        let config = Config::from_lookup(lookup_from(&[
            ("DB_USERNAME", "reporter"),
            ("DB_PASSWORD", "hunter2"),
        ]));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["database"]["username"], "reporter");
        assert!(value["database"].get("password").is_none());
        assert!(!value.to_string().contains("hunter2"));
    }
}
