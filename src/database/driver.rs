//! SQL Server driver seam.
//!
//! [`SqlDriver`] is the single point where the crate talks to a database.
//! [`TdsDriver`] is the production implementation over tiberius; tests swap in
//! an in-memory driver.

use crate::constants::SQL_BROWSER_TIMEOUT;
use crate::database::connection::ConnectionDescriptor;
use crate::database::query::{BoundQuery, ResultRow};
use crate::database::types::TypeMapper;
use crate::error::ServerError;
use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use tiberius::{Client, QueryItem, Row, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// Type alias for a raw tiberius connection.
pub type RawConnection = Client<Compat<TcpStream>>;

/// Runs one statement against the server described by a descriptor.
#[async_trait]
pub trait SqlDriver: Send + Sync {
    /// Connect, execute `query` with its bound parameters, and return the
    /// rows of the first result set.
    async fn query(
        &self,
        descriptor: &ConnectionDescriptor,
        query: &BoundQuery,
    ) -> Result<Vec<ResultRow>, ServerError>;
}

/// Production driver: one TCP connection per call, closed afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct TdsDriver;

impl TdsDriver {
    pub fn new() -> Self {
        Self
    }

    /// Open a connection for the descriptor.
    ///
    /// 1. Builds the tiberius configuration
    /// 2. Establishes the TCP connection, resolving named instances first
    /// 3. Performs the TDS handshake
    pub async fn connect(descriptor: &ConnectionDescriptor) -> Result<RawConnection, ServerError> {
        let endpoint = descriptor.endpoint()?;
        let config = descriptor.tds_config()?;
        let address = config.get_addr();
        debug!(
            "Creating connection to {} ({})",
            address,
            descriptor.redacted_connection_string()
        );

        let tcp = match endpoint.instance.as_deref() {
            Some(instance) if endpoint.needs_browser() => {
                debug!("Resolving instance {} through SQL Browser at {}", instance, address);
                tokio::time::timeout(SQL_BROWSER_TIMEOUT, TcpStream::connect_named(&config))
                    .await
                    .map_err(|_| {
                        ServerError::Timeout(format!(
                            "Timed out resolving instance {} on {}",
                            instance, endpoint.host
                        ))
                    })?
                    .map_err(|e| {
                        ServerError::connection(format!(
                            "Failed to resolve instance {} on {}: {}",
                            instance, endpoint.host, e
                        ))
                    })?
            }
            _ => TcpStream::connect(&address).await.map_err(|e| {
                ServerError::connection_with_source(
                    format!("Failed to connect to {}: {}", address, e),
                    e,
                )
            })?,
        };

        tcp.set_nodelay(true)
            .map_err(|e| ServerError::connection(format!("Failed to set TCP_NODELAY: {}", e)))?;

        let client = Client::connect(config, tcp.compat_write()).await?;

        debug!("Connection established");
        Ok(client)
    }
}

#[async_trait]
impl SqlDriver for TdsDriver {
    async fn query(
        &self,
        descriptor: &ConnectionDescriptor,
        query: &BoundQuery,
    ) -> Result<Vec<ResultRow>, ServerError> {
        let mut client = Self::connect(descriptor).await?;

        let mut rows = Vec::new();
        {
            let params = query.sql_params();
            let mut stream = client.query(query.text.as_str(), &params).await?;

            // Only the first result set is returned
            while let Some(item) = stream.try_next().await? {
                if let QueryItem::Row(row) = item {
                    if row.result_index() == 0 {
                        rows.push(row_to_result(&row));
                    }
                }
            }
        }

        if let Err(e) = client.close().await {
            debug!("Error closing connection: {}", e);
        }

        Ok(rows)
    }
}

/// Convert a tiberius row into an ordered [`ResultRow`].
fn row_to_result(row: &Row) -> ResultRow {
    let mut result = ResultRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        result.insert(column.name(), TypeMapper::extract_column(row, idx));
    }
    result
}
