//! Database connectivity and query execution.

pub mod connection;
pub mod driver;
pub mod metadata;
pub mod params;
pub mod query;
pub mod types;

pub use connection::{ConnectionDescriptor, ConnectionDescriptorBuilder, ServerEndpoint};
pub use driver::{SqlDriver, TdsDriver};
pub use metadata::{
    aggregate, filter_database_names, ColumnInfo, DatabaseSchema, MetadataQueries,
    SchemaQueryBuilder, SchemaRow, TableInfo,
};
pub use params::bind_named_parameters;
pub use query::{BoundQuery, FromResultRow, QueryExecutor, QueryParam, ResultRow};
pub use types::{SqlValue, TypeMapper};
