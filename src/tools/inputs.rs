//! Tool input and output types with JSON Schema generation.

use crate::database::ResultRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input for `get_databases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetDatabasesInput {
    /// Optional filter to narrow down database results (case-insensitive substring).
    #[serde(default)]
    pub filter: Option<String>,

    /// Accepted for client compatibility and ignored: connections always go to
    /// the configured server.
    #[serde(default)]
    pub server: Option<String>,
}

/// Input for `get_database_schema`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetDatabaseSchemaInput {
    /// Optional list of specific tables to retrieve schema for.
    #[serde(default)]
    pub tables: Option<Vec<String>>,

    /// Optional list of specific schemas to retrieve schema for.
    #[serde(default)]
    pub schemas: Option<Vec<String>>,
}

/// Input for `execute_select_query`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteSelectQueryInput {
    /// The SELECT query to execute. Must begin with SELECT.
    pub query: String,

    /// Optional parameters to use in the query. Use @paramName in the query
    /// and provide values (string, number, boolean or null) here.
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

/// Success payload of `execute_select_query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectQueryOutput {
    pub success: bool,
    pub row_count: usize,
    pub data: Vec<ResultRow>,
}

impl SelectQueryOutput {
    pub fn new(data: Vec<ResultRow>) -> Self {
        Self {
            success: true,
            row_count: data.len(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inputs_accept_missing_optionals() {
        let input: GetDatabasesInput = serde_json::from_value(json!({})).unwrap();
        assert!(input.filter.is_none());
        assert!(input.server.is_none());

        let input: GetDatabaseSchemaInput =
            serde_json::from_value(json!({ "tables": ["Users"] })).unwrap();
        assert_eq!(input.tables, Some(vec!["Users".to_string()]));
        assert!(input.schemas.is_none());
    }

    #[test]
    fn test_select_input_requires_query() {
        assert!(serde_json::from_value::<ExecuteSelectQueryInput>(json!({})).is_err());

        let input: ExecuteSelectQueryInput = serde_json::from_value(json!({
            "query": "SELECT @id",
            "parameters": { "id": 1 }
        }))
        .unwrap();
        assert_eq!(input.parameters.map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_select_output_shape() {
        let output = SelectQueryOutput::new(vec![ResultRow::new().with("Id", 1)]);
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(
            value,
            json!({ "success": true, "rowCount": 1, "data": [{ "Id": 1 }] })
        );
    }
}
