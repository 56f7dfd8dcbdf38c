//! MCP Tools for SQL Server operations.
//!
//! - `get_databases`: List user databases, optionally filtered by name
//! - `get_database_schema`: Describe user tables and their columns
//! - `execute_select_query`: Run a single read-only SELECT with named parameters
//!
//! Every tool answers with either its success payload or a
//! `{ "error", "message" }` object flagged as a tool error.

mod inputs;

pub use inputs::*;

use crate::database::{bind_named_parameters, BoundQuery, DatabaseSchema};
use crate::error::ServerError;
use crate::server::SchemaMcpServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content};
use rmcp::{tool, tool_router, ErrorData as McpError};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Failure headline of `get_databases`.
pub const GET_DATABASES_ERROR: &str = "Failed to retrieve databases";

/// Failure headline of `get_database_schema`.
pub const GET_SCHEMA_ERROR: &str = "Failed to retrieve database schema";

/// Failure headline of `execute_select_query`.
pub const EXECUTE_QUERY_ERROR: &str = "Failed to execute query";

#[tool_router(vis = "pub(crate)")]
impl SchemaMcpServer {
    #[tool(description = "Retrieves a list of available databases from MSSQL Server")]
    pub async fn get_databases(
        &self,
        Parameters(input): Parameters<GetDatabasesInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.list_databases(input).await, GET_DATABASES_ERROR)
    }

    #[tool(
        description = "Retrieves schema information (tables, columns, keys) from the configured database. Optionally restrict to specific tables or schemas."
    )]
    pub async fn get_database_schema(
        &self,
        Parameters(input): Parameters<GetDatabaseSchemaInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.describe_schema(input).await, GET_SCHEMA_ERROR)
    }

    #[tool(
        description = "Executes a parameterized SELECT query against the database. Only a single SELECT statement is accepted; use @paramName placeholders and pass values in parameters."
    )]
    pub async fn execute_select_query(
        &self,
        Parameters(input): Parameters<ExecuteSelectQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        tool_result(self.run_select(input).await, EXECUTE_QUERY_ERROR)
    }
}

impl SchemaMcpServer {
    /// List user databases, optionally filtered by a case-insensitive substring.
    pub async fn list_databases(&self, input: GetDatabasesInput) -> Result<Vec<String>, ServerError> {
        if let Some(server) = input.server.as_deref().filter(|s| !s.trim().is_empty()) {
            debug!("Ignoring requested server {}; using the configured server", server);
        }
        let descriptor = self.descriptor();
        let names = self
            .metadata
            .list_databases(&descriptor, input.filter.as_deref())
            .await?;
        debug!("Found {} databases", names.len());
        Ok(names)
    }

    /// Describe user tables, optionally restricted by table or schema name.
    pub async fn describe_schema(
        &self,
        input: GetDatabaseSchemaInput,
    ) -> Result<DatabaseSchema, ServerError> {
        let descriptor = self.descriptor();
        let schema = self
            .metadata
            .database_schema(
                &descriptor,
                input.tables.as_deref(),
                input.schemas.as_deref(),
            )
            .await?;
        debug!("Described {} tables", schema.tables.len());
        Ok(schema)
    }

    /// Validate and run a caller-supplied SELECT.
    pub async fn run_select(
        &self,
        input: ExecuteSelectQueryInput,
    ) -> Result<SelectQueryOutput, ServerError> {
        let text = self.validator.validate(&input.query)?;

        let query = match &input.parameters {
            Some(params) => bind_named_parameters(text, params)?,
            None => BoundQuery::new(text),
        };

        let descriptor = self.descriptor();
        let rows = self.executor.execute_rows(&descriptor, &query).await?;
        Ok(SelectQueryOutput::new(rows))
    }
}

/// Shape an operation result into a tool result.
fn tool_result<T: Serialize>(
    result: Result<T, ServerError>,
    operation_error: &str,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
        Err(e) => {
            if e.is_validation() {
                info!("Rejected tool input: {}", e);
            } else {
                warn!("{}: {}", operation_error, e);
            }
            Ok(CallToolResult::error(vec![Content::json(
                e.to_payload(operation_error),
            )?]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::driver::mock::MockDriver;
    use crate::database::{QueryParam, ResultRow, SqlValue};
    use crate::error::ErrorPayload;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "DB_SERVER" => Some("sql01".to_string()),
            "DB_DATABASE" => Some("Sales".to_string()),
            "DB_USERNAME" => Some("reader".to_string()),
            "DB_PASSWORD" => Some("pw".to_string()),
            _ => None,
        })
    }

    fn server_with(driver: Arc<MockDriver>) -> SchemaMcpServer {
        SchemaMcpServer::with_driver(config(), driver)
    }

    fn payload(result: &CallToolResult) -> Value {
        let text = result.content[0]
            .raw
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        serde_json::from_str(&text).unwrap()
    }

    fn db_row(name: &str) -> ResultRow {
        ResultRow::new().with("name", name)
    }

    #[tokio::test]
    async fn test_get_databases_filters_names() {
        let driver = Arc::new(MockDriver::with_rows(vec![
            db_row("Sales"),
            db_row("SalesArchive"),
            db_row("Hr"),
        ]));
        let server = server_with(driver.clone());

        let result = server
            .get_databases(Parameters(GetDatabasesInput {
                filter: Some("sal".to_string()),
                server: None,
            }))
            .await
            .unwrap();

        assert_ne!(result.is_error, Some(true));
        assert_eq!(payload(&result), json!(["Sales", "SalesArchive"]));
        assert!(driver.queries()[0].text.contains("database_id > 4"));
    }

    #[tokio::test]
    async fn test_get_databases_ignores_requested_server() {
        let driver = Arc::new(MockDriver::with_rows(vec![db_row("Ops")]));
        let server = server_with(driver.clone());

        let names = server
            .list_databases(GetDatabasesInput {
                filter: None,
                server: Some("reporting01.example.com".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(names, ["Ops"]);
        let descriptors = driver.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].server, server.config.database.server);
        assert_ne!(descriptors[0].server, "reporting01.example.com");
    }

    #[tokio::test]
    async fn test_get_databases_failure_payload() {
        let driver = Arc::new(MockDriver::failing(|| {
            ServerError::auth("Login failed for user 'reader'.")
        }));
        let server = server_with(driver);

        let result = server
            .get_databases(Parameters(GetDatabasesInput::default()))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        let body: ErrorPayload = serde_json::from_value(payload(&result)).unwrap();
        assert_eq!(body.error, GET_DATABASES_ERROR);
        assert_eq!(body.message, "Login failed for user 'reader'.");
    }

    #[tokio::test]
    async fn test_get_database_schema_binds_filters() {
        let row = ResultRow::new()
            .with("TableName", "Users")
            .with("SchemaName", "dbo")
            .with("ColumnName", "Id")
            .with("DataTypeName", "int")
            .with("MaxLength", SqlValue::I16(4))
            .with("Precision", SqlValue::U8(10))
            .with("Scale", SqlValue::U8(0))
            .with("IsNullable", false)
            .with("IsIdentity", true)
            .with("IsPrimaryKey", 1)
            .with("IsForeignKey", 0);
        let driver = Arc::new(MockDriver::with_rows(vec![row]));
        let server = server_with(driver.clone());

        let result = server
            .get_database_schema(Parameters(GetDatabaseSchemaInput {
                tables: Some(vec!["Users".to_string()]),
                schemas: Some(vec!["dbo".to_string()]),
            }))
            .await
            .unwrap();

        let body = payload(&result);
        assert_eq!(body["tables"][0]["Name"], "Users");
        assert_eq!(body["tables"][0]["Columns"][0]["IsPrimaryKey"], true);

        let query = &driver.queries()[0];
        assert!(query.text.contains("t.name IN (@P1)"));
        assert!(query.text.contains("s.name IN (@P2)"));
        assert_eq!(
            query.params,
            vec![QueryParam::from("Users"), QueryParam::from("dbo")]
        );
    }

    #[tokio::test]
    async fn test_get_database_schema_failure_payload() {
        let driver = Arc::new(MockDriver::failing(|| {
            ServerError::connection("Connection refused")
        }));
        let server = server_with(driver);

        let result = server
            .get_database_schema(Parameters(GetDatabaseSchemaInput::default()))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            payload(&result),
            json!({ "error": GET_SCHEMA_ERROR, "message": "Connection refused" })
        );
    }

    #[tokio::test]
    async fn test_execute_select_query_success() {
        let driver = Arc::new(MockDriver::with_rows(vec![
            ResultRow::new().with("Id", 1).with("Name", "Ann"),
            ResultRow::new().with("Id", 2).with("Name", SqlValue::Null),
        ]));
        let server = server_with(driver.clone());

        let mut parameters = serde_json::Map::new();
        parameters.insert("minId".to_string(), json!(1));

        let result = server
            .execute_select_query(Parameters(ExecuteSelectQueryInput {
                query: "  SELECT Id, Name FROM dbo.Users WHERE Id >= @minId".to_string(),
                parameters: Some(parameters),
            }))
            .await
            .unwrap();

        assert_eq!(
            payload(&result),
            json!({
                "success": true,
                "rowCount": 2,
                "data": [{ "Id": 1, "Name": "Ann" }, { "Id": 2, "Name": null }]
            })
        );

        let query = &driver.queries()[0];
        assert_eq!(query.text, "SELECT Id, Name FROM dbo.Users WHERE Id >= @P1");
        assert_eq!(query.params, vec![QueryParam::Int(1)]);
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_driver() {
        let driver = Arc::new(MockDriver::with_rows(Vec::new()));
        let server = server_with(driver.clone());

        for query in ["DELETE FROM Users", "SELECTx FROM T", "SELECT 1; DROP TABLE T"] {
            let result = server
                .execute_select_query(Parameters(ExecuteSelectQueryInput {
                    query: query.to_string(),
                    parameters: None,
                }))
                .await
                .unwrap();

            assert_eq!(result.is_error, Some(true));
            assert_eq!(payload(&result)["error"], "Invalid query");
        }

        assert!(driver.queries().is_empty());
    }

    #[tokio::test]
    async fn test_execute_select_query_driver_failure() {
        let driver = Arc::new(MockDriver::failing(|| {
            ServerError::query_error_with_code("Invalid object name 'dbo.Missing'.", 208)
        }));
        let server = server_with(driver);

        let result = server
            .execute_select_query(Parameters(ExecuteSelectQueryInput {
                query: "SELECT * FROM dbo.Missing".to_string(),
                parameters: None,
            }))
            .await
            .unwrap();

        assert_eq!(
            payload(&result),
            json!({
                "error": EXECUTE_QUERY_ERROR,
                "message": "Invalid object name 'dbo.Missing'."
            })
        );
    }

    #[tokio::test]
    async fn test_non_scalar_parameter_rejected() {
        let driver = Arc::new(MockDriver::with_rows(Vec::new()));
        let server = server_with(driver.clone());

        let mut parameters = serde_json::Map::new();
        parameters.insert("ids".to_string(), json!([1, 2]));

        let result = server
            .execute_select_query(Parameters(ExecuteSelectQueryInput {
                query: "SELECT * FROM T WHERE Id = @ids".to_string(),
                parameters: Some(parameters),
            }))
            .await
            .unwrap();

        assert_eq!(payload(&result)["error"], "Invalid input");
        assert!(driver.queries().is_empty());
    }
}
