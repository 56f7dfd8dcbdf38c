//! Error types for the schema MCP server.
//!
//! This module defines semantic error types with SQL Server error code mapping
//! and the `{ error, message }` payload every tool returns on failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain-specific errors for the schema MCP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Caller-supplied query rejected before reaching the driver
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Malformed tool input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Database not found or not accessible
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Query execution error
    #[error("Query execution error: {message}")]
    QueryExecution {
        message: String,
        sql_error_code: Option<i32>,
    },

    /// Query or connect timeout reported by the driver
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A driver row did not have the shape a typed row expects
    #[error("Unexpected row shape: {0}")]
    RowDecode(String),
}

/// Structured failure payload returned by every tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Short failure headline, e.g. `Invalid query`.
    pub error: String,
    /// Detail, passed through from the driver where applicable.
    pub message: String,
}

impl ServerError {
    /// Create an invalid query error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an authentication error.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a query execution error.
    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create a query execution error with the SQL Server error number.
    pub fn query_error_with_code(msg: impl Into<String>, code: i32) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: Some(code),
        }
    }

    /// Create a row decoding error.
    pub fn row_decode(msg: impl Into<String>) -> Self {
        Self::RowDecode(msg.into())
    }

    /// Whether the error was raised before any driver contact.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidQuery(_) | Self::InvalidInput(_))
    }

    /// The underlying message without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidQuery(msg)
            | Self::InvalidInput(msg)
            | Self::Authentication(msg)
            | Self::DatabaseNotFound(msg)
            | Self::PermissionDenied(msg)
            | Self::Timeout(msg)
            | Self::RowDecode(msg) => msg,
            Self::Connection { message, .. } | Self::QueryExecution { message, .. } => message,
        }
    }

    /// Shape this error into a tool failure payload.
    ///
    /// `operation_error` is the headline used for driver-side failures;
    /// invalid queries always report `Invalid query`.
    pub fn to_payload(&self, operation_error: &str) -> ErrorPayload {
        let error = match self {
            Self::InvalidQuery(_) => "Invalid query",
            Self::InvalidInput(_) => "Invalid input",
            _ => operation_error,
        };
        ErrorPayload {
            error: error.to_string(),
            message: self.detail().to_string(),
        }
    }
}

/// Map SQL Server error codes to semantic ServerError types.
pub fn from_sql_error(code: i32, message: &str) -> ServerError {
    match code {
        // Authentication errors
        18456 => ServerError::auth(message),

        // Database errors
        4060 => ServerError::DatabaseNotFound(message.to_string()),

        // Permission errors
        229 | 230 => ServerError::PermissionDenied(message.to_string()),

        // Timeout
        -2 => ServerError::Timeout(message.to_string()),

        // Connection errors
        -1 | 53 => ServerError::connection(message),

        // Default: generic query error, message passed through
        _ => ServerError::query_error_with_code(message, code),
    }
}

impl From<tiberius::error::Error> for ServerError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match &e {
            Error::Server(token) => from_sql_error(token.code() as i32, token.message()),
            Error::Io { .. } => ServerError::connection(format!("IO error: {}", e)),
            Error::Tls(_) => ServerError::connection(format!("TLS error: {}", e)),
            Error::Protocol(_) => ServerError::connection(format!("Protocol error: {}", e)),
            Error::Routing { .. } => ServerError::connection(e.to_string()),
            Error::Conversion(_) => {
                ServerError::query_error(format!("Type conversion error: {}", e))
            }
            _ => ServerError::query_error(e.to_string()),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut => ServerError::Timeout(e.to_string()),
            _ => ServerError::connection_with_source(format!("IO error: {}", e), e),
        }
    }
}
