//! SQL Server metadata queries for schema introspection.
//!
//! The schema pipeline is a single catalog query followed by one ordered pass
//! that folds the flat column rows into tables.

use crate::constants::LAST_SYSTEM_DATABASE_ID;
use crate::database::connection::ConnectionDescriptor;
use crate::database::query::{BoundQuery, FromResultRow, QueryExecutor, ResultRow};
use crate::database::types::SqlValue;
use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One catalog row: a single column of a single user table.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRow {
    pub table_name: String,
    pub schema_name: String,
    pub column_name: String,
    pub data_type_name: String,
    pub max_length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub is_nullable: bool,
    pub is_identity: bool,
    /// 1 when the column belongs to the primary key, else 0.
    pub is_primary_key_flag: i64,
    /// 1 when the column participates in a foreign key, else 0.
    pub is_foreign_key_flag: i64,
}

impl FromResultRow for SchemaRow {
    fn from_row(row: &ResultRow) -> Result<Self, ServerError> {
        Ok(Self {
            table_name: require_string(row, "TableName")?,
            schema_name: require_string(row, "SchemaName")?,
            column_name: require_string(row, "ColumnName")?,
            data_type_name: require_string(row, "DataTypeName")?,
            max_length: extract_i64(row, "MaxLength"),
            precision: extract_i64(row, "Precision"),
            scale: extract_i64(row, "Scale"),
            is_nullable: require_bool(row, "IsNullable")?,
            is_identity: require_bool(row, "IsIdentity")?,
            is_primary_key_flag: require_i64(row, "IsPrimaryKey")?,
            is_foreign_key_flag: require_i64(row, "IsForeignKey")?,
        })
    }
}

/// Column description as returned to tool callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "Type")]
    pub data_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    pub is_identity: bool,
}

impl From<SchemaRow> for ColumnInfo {
    fn from(row: SchemaRow) -> Self {
        Self {
            name: row.column_name,
            data_type: row.data_type_name,
            nullable: row.is_nullable,
            is_primary_key: row.is_primary_key_flag == 1,
            is_foreign_key: row.is_foreign_key_flag == 1,
            max_length: row.max_length,
            precision: row.precision,
            scale: row.scale,
            is_identity: row.is_identity,
        }
    }
}

/// A user table and its columns in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableInfo {
    pub name: String,
    pub schema: String,
    pub columns: Vec<ColumnInfo>,
}

/// Payload of `get_database_schema`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: Vec<TableInfo>,
}

/// Builds the catalog query behind `get_database_schema`.
pub struct SchemaQueryBuilder;

impl SchemaQueryBuilder {
    const SELECT: &'static str = r#"
        SELECT
            t.name AS TableName,
            s.name AS SchemaName,
            c.name AS ColumnName,
            ty.name AS DataTypeName,
            c.max_length AS MaxLength,
            c.precision AS Precision,
            c.scale AS Scale,
            c.is_nullable AS IsNullable,
            c.is_identity AS IsIdentity,
            CASE WHEN pk.column_id IS NOT NULL THEN 1 ELSE 0 END AS IsPrimaryKey,
            CASE WHEN fk.parent_column_id IS NOT NULL THEN 1 ELSE 0 END AS IsForeignKey
        FROM sys.tables t
        INNER JOIN sys.schemas s ON t.schema_id = s.schema_id
        INNER JOIN sys.columns c ON t.object_id = c.object_id
        INNER JOIN sys.types ty ON c.user_type_id = ty.user_type_id
        LEFT JOIN (
            SELECT ic.object_id, ic.column_id
            FROM sys.indexes i
            INNER JOIN sys.index_columns ic
                ON i.object_id = ic.object_id AND i.index_id = ic.index_id
            WHERE i.is_primary_key = 1
        ) pk ON c.object_id = pk.object_id AND c.column_id = pk.column_id
        LEFT JOIN (
            SELECT DISTINCT parent_object_id, parent_column_id
            FROM sys.foreign_key_columns
        ) fk ON c.object_id = fk.parent_object_id AND c.column_id = fk.parent_column_id
        WHERE t.type = 'U'"#;

    /// Build the schema query. Non-empty filters restrict by table or schema
    /// name; the names are bound as parameters.
    pub fn build(table_filter: Option<&[String]>, schema_filter: Option<&[String]>) -> BoundQuery {
        let mut query = BoundQuery::default();
        let mut text = String::from(Self::SELECT);

        if let Some(clause) = Self::in_clause(&mut query, "t.name", table_filter) {
            text.push_str(&clause);
        }
        if let Some(clause) = Self::in_clause(&mut query, "s.name", schema_filter) {
            text.push_str(&clause);
        }

        text.push_str("\n        ORDER BY s.name, t.name, c.column_id");
        query.text = text;
        query
    }

    fn in_clause(query: &mut BoundQuery, column: &str, names: Option<&[String]>) -> Option<String> {
        let names = names.filter(|n| !n.is_empty())?;
        let placeholders: Vec<String> = names.iter().map(|n| query.bind(n.as_str())).collect();
        Some(format!("\n            AND {} IN ({})", column, placeholders.join(", ")))
    }
}

/// Fold catalog rows into tables.
///
/// Rows must arrive ordered by schema, table and column id. Tables appear in
/// first-seen order and columns in arrival order; nothing is re-sorted.
pub fn aggregate(rows: impl IntoIterator<Item = SchemaRow>) -> Vec<TableInfo> {
    let mut tables: Vec<TableInfo> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let key = (row.schema_name.clone(), row.table_name.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            tables.push(TableInfo {
                name: row.table_name.clone(),
                schema: row.schema_name.clone(),
                columns: Vec::new(),
            });
            tables.len() - 1
        });
        tables[slot].columns.push(ColumnInfo::from(row));
    }

    tables
}

/// A row of the database list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseName(pub String);

impl FromResultRow for DatabaseName {
    fn from_row(row: &ResultRow) -> Result<Self, ServerError> {
        require_string(row, "name").map(Self)
    }
}

/// Query listing user databases (system databases excluded) by name.
pub fn list_databases_query() -> BoundQuery {
    BoundQuery::new(format!(
        "SELECT name FROM sys.databases WHERE database_id > {} ORDER BY name",
        LAST_SYSTEM_DATABASE_ID
    ))
}

/// Keep names containing `filter`, case-insensitively. A missing or blank
/// filter keeps everything. Order is preserved.
pub fn filter_database_names(names: Vec<String>, filter: Option<&str>) -> Vec<String> {
    match filter.map(str::to_lowercase).filter(|f| !f.is_empty()) {
        Some(needle) => names
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect(),
        None => names,
    }
}

/// Catalog operations over a [`QueryExecutor`].
#[derive(Debug, Clone)]
pub struct MetadataQueries {
    executor: QueryExecutor,
}

impl MetadataQueries {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// List user database names, optionally filtered.
    pub async fn list_databases(
        &self,
        descriptor: &ConnectionDescriptor,
        filter: Option<&str>,
    ) -> Result<Vec<String>, ServerError> {
        let names: Vec<DatabaseName> = self
            .executor
            .execute(descriptor, &list_databases_query())
            .await?;
        let names = names.into_iter().map(|n| n.0).collect();
        Ok(filter_database_names(names, filter))
    }

    /// Describe user tables and their columns.
    pub async fn database_schema(
        &self,
        descriptor: &ConnectionDescriptor,
        tables: Option<&[String]>,
        schemas: Option<&[String]>,
    ) -> Result<DatabaseSchema, ServerError> {
        let query = SchemaQueryBuilder::build(tables, schemas);
        let rows: Vec<SchemaRow> = self.executor.execute(descriptor, &query).await?;
        debug!("Schema query returned {} column rows", rows.len());
        Ok(DatabaseSchema {
            tables: aggregate(rows),
        })
    }
}

// Helper functions for extracting values from result rows

fn require_string(row: &ResultRow, column: &str) -> Result<String, ServerError> {
    match row.require(column)? {
        SqlValue::String(s) => Ok(s.clone()),
        SqlValue::Null => Err(ServerError::row_decode(format!("{} is NULL", column))),
        other => Ok(other.to_display_string()),
    }
}

fn extract_i64(row: &ResultRow, column: &str) -> Option<i64> {
    row.get(column).and_then(SqlValue::as_i64)
}

fn require_i64(row: &ResultRow, column: &str) -> Result<i64, ServerError> {
    row.require(column)?
        .as_i64()
        .ok_or_else(|| ServerError::row_decode(format!("{} is not an integer", column)))
}

fn require_bool(row: &ResultRow, column: &str) -> Result<bool, ServerError> {
    row.require(column)?
        .as_bool()
        .ok_or_else(|| ServerError::row_decode(format!("{} is not a flag", column)))
}
