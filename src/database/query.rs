//! Query execution and result handling.

use crate::constants::LOG_QUERY_PREVIEW_LEN;
use crate::database::connection::ConnectionDescriptor;
use crate::database::driver::SqlDriver;
use crate::database::types::SqlValue;
use crate::error::ServerError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tiberius::{ColumnData, ToSql};
use tracing::debug;

/// A positional parameter bound to `@P1..@Pn`.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl QueryParam {
    /// Convert a JSON scalar into a parameter. Arrays and objects are rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ServerError> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(ServerError::invalid_input(format!(
                        "Numeric parameter out of range: {}",
                        n
                    )))
                }
            }
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(ServerError::invalid_input(
                "Parameter values must be strings, numbers, booleans or null",
            )),
        }
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl ToSql for QueryParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            // NULL is sent as a typed NVARCHAR null
            QueryParam::Null => ColumnData::String(None),
            QueryParam::Bool(v) => ColumnData::Bit(Some(*v)),
            QueryParam::Int(v) => ColumnData::I64(Some(*v)),
            QueryParam::Float(v) => ColumnData::F64(Some(*v)),
            QueryParam::String(v) => ColumnData::String(Some(Cow::Borrowed(v.as_str()))),
        }
    }
}

/// Statement text plus the parameters it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundQuery {
    /// SQL text using `@P1..@Pn` placeholders.
    pub text: String,
    /// Parameters in placeholder order.
    pub params: Vec<QueryParam>,
}

impl BoundQuery {
    /// A statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its placeholder.
    pub fn bind(&mut self, param: impl Into<QueryParam>) -> String {
        self.params.push(param.into());
        format!("@P{}", self.params.len())
    }

    /// Parameters as driver arguments.
    pub fn sql_params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql).collect()
    }
}

/// A single row of query results, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    columns: Vec<(String, SqlValue)>,
}

impl ResultRow {
    /// Create an empty result row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a value by column name, failing when the column is missing.
    pub fn require(&self, column: &str) -> Result<&SqlValue, ServerError> {
        self.get(column)
            .ok_or_else(|| ServerError::row_decode(format!("missing column {}", column)))
    }

    /// Append a value. A repeated column name replaces the earlier value.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Builder-style [`ResultRow::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Types that can be decoded from a [`ResultRow`].
pub trait FromResultRow: Sized {
    fn from_row(row: &ResultRow) -> Result<Self, ServerError>;
}

impl FromResultRow for ResultRow {
    fn from_row(row: &ResultRow) -> Result<Self, ServerError> {
        Ok(row.clone())
    }
}

/// Query executor for running SQL queries.
///
/// Each call opens its own connection through the driver; nothing is shared
/// between calls.
#[derive(Clone)]
pub struct QueryExecutor {
    driver: Arc<dyn SqlDriver>,
}

impl QueryExecutor {
    /// Create a new query executor.
    pub fn new(driver: Arc<dyn SqlDriver>) -> Self {
        Self { driver }
    }

    /// Execute a query and return the raw rows.
    pub async fn execute_rows(
        &self,
        descriptor: &ConnectionDescriptor,
        query: &BoundQuery,
    ) -> Result<Vec<ResultRow>, ServerError> {
        let start = Instant::now();

        debug!(
            "Executing query on {}: {} ({} params)",
            descriptor.server,
            truncate_for_log(&query.text, LOG_QUERY_PREVIEW_LEN),
            query.params.len()
        );

        let rows = self.driver.query(descriptor, query).await?;

        debug!(
            "Query completed: {} rows in {} ms",
            rows.len(),
            start.elapsed().as_millis()
        );

        Ok(rows)
    }

    /// Execute a query and decode every row into `T`.
    pub async fn execute<T: FromResultRow>(
        &self,
        descriptor: &ConnectionDescriptor,
        query: &BoundQuery,
    ) -> Result<Vec<T>, ServerError> {
        let rows = self.execute_rows(descriptor, query).await?;
        rows.iter().map(T::from_row).collect()
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor").finish_non_exhaustive()
    }
}

/// Truncate a string for logging purposes.
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
