//! SQL Server type mapping to Rust types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tiberius::Row;
use uuid::Uuid;

/// A SQL value that can be serialized to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Integer view of the value, widening smaller integer types.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::U8(v) => Some(i64::from(*v)),
            SqlValue::I16(v) => Some(i64::from(*v)),
            SqlValue::I32(v) => Some(i64::from(*v)),
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Boolean view of the value. `BIT` columns and integer flags both coerce.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            other => other.as_i64().map(|v| v != 0),
        }
    }

    /// String view of the value, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::U8(v) => v.to_string(),
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::String(v) => v.clone(),
            SqlValue::Bytes(v) => format!("0x{}", hex::encode(v)),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::Uuid(v) => v.to_string(),
            SqlValue::Date(v) => v.to_string(),
            SqlValue::Time(v) => v.to_string(),
            SqlValue::DateTime(v) => v.to_string(),
            SqlValue::DateTimeUtc(v) => v.to_rfc3339(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::I32(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

/// Type mapper for converting SQL Server column data to [`SqlValue`].
pub struct TypeMapper;

impl TypeMapper {
    /// Extract a value from a Tiberius row column.
    pub fn extract_column(row: &Row, idx: usize) -> SqlValue {
        if row.columns().get(idx).is_none() {
            return SqlValue::Null;
        }

        // Strings (most common in catalog output)
        if let Some(v) = row.try_get::<&str, _>(idx).ok().flatten() {
            return SqlValue::String(v.to_string());
        }

        // Integers
        if let Some(v) = row.try_get::<i32, _>(idx).ok().flatten() {
            return SqlValue::I32(v);
        }
        if let Some(v) = row.try_get::<i64, _>(idx).ok().flatten() {
            return SqlValue::I64(v);
        }
        if let Some(v) = row.try_get::<i16, _>(idx).ok().flatten() {
            return SqlValue::I16(v);
        }
        // TINYINT is unsigned in SQL Server (precision/scale columns)
        if let Some(v) = row.try_get::<u8, _>(idx).ok().flatten() {
            return SqlValue::U8(v);
        }

        // Boolean
        if let Some(v) = row.try_get::<bool, _>(idx).ok().flatten() {
            return SqlValue::Bool(v);
        }

        // Floating point
        if let Some(v) = row.try_get::<f64, _>(idx).ok().flatten() {
            return SqlValue::F64(v);
        }
        if let Some(v) = row.try_get::<f32, _>(idx).ok().flatten() {
            return SqlValue::F32(v);
        }

        // Decimal
        if let Some(v) = row.try_get::<Decimal, _>(idx).ok().flatten() {
            return SqlValue::Decimal(v);
        }

        // UUID
        if let Some(v) = row.try_get::<Uuid, _>(idx).ok().flatten() {
            return SqlValue::Uuid(v);
        }

        // Date/Time types
        if let Some(v) = row.try_get::<DateTime<Utc>, _>(idx).ok().flatten() {
            return SqlValue::DateTimeUtc(v);
        }
        if let Some(v) = row.try_get::<NaiveDateTime, _>(idx).ok().flatten() {
            return SqlValue::DateTime(v);
        }
        if let Some(v) = row.try_get::<NaiveDate, _>(idx).ok().flatten() {
            return SqlValue::Date(v);
        }
        if let Some(v) = row.try_get::<NaiveTime, _>(idx).ok().flatten() {
            return SqlValue::Time(v);
        }

        // Binary
        if let Some(v) = row.try_get::<&[u8], _>(idx).ok().flatten() {
            return SqlValue::Bytes(v.to_vec());
        }

        // NULLs and unsupported types
        SqlValue::Null
    }
}

mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_display() {
        assert_eq!(SqlValue::Null.to_display_string(), "NULL");
        assert_eq!(SqlValue::I32(42).to_display_string(), "42");
        assert_eq!(SqlValue::U8(200).to_display_string(), "200");
        assert_eq!(
            SqlValue::String("hello".to_string()).to_display_string(),
            "hello"
        );
        assert_eq!(SqlValue::Bytes(vec![0xDE, 0xAD]).to_display_string(), "0xDEAD");
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(SqlValue::I16(-1).as_i64(), Some(-1));
        assert_eq!(SqlValue::U8(255).as_i64(), Some(255));
        assert_eq!(SqlValue::String("1".into()).as_i64(), None);
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(SqlValue::Bool(true).as_bool(), Some(true));
        assert_eq!(SqlValue::I32(1).as_bool(), Some(true));
        assert_eq!(SqlValue::I32(0).as_bool(), Some(false));
        assert_eq!(SqlValue::Null.as_bool(), None);
    }

    #[test]
    fn test_untagged_serialization() {
        let json = serde_json::to_value(vec![
            SqlValue::Null,
            SqlValue::I32(7),
            SqlValue::String("x".into()),
            SqlValue::Bool(false),
        ])
        .unwrap();
        assert_eq!(json, serde_json::json!([null, 7, "x", false]));
    }
}
