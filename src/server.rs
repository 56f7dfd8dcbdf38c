//! MCP server struct definition and initialization.

use crate::config::Config;
use crate::database::{
    ConnectionDescriptor, ConnectionDescriptorBuilder, MetadataQueries, QueryExecutor, SqlDriver,
    TdsDriver,
};
use crate::security::SelectQueryValidator;
use rmcp::handler::server::router::tool::ToolRouter;
use std::sync::Arc;

/// The schema MCP server instance.
///
/// This struct is cloned for each request, but everything it holds is
/// immutable and shared via Arc. Connections are opened per tool call and
/// never kept.
#[derive(Clone)]
pub struct SchemaMcpServer {
    /// Configuration.
    pub(crate) config: Arc<Config>,

    /// Query executor.
    pub(crate) executor: QueryExecutor,

    /// Catalog queries.
    pub(crate) metadata: Arc<MetadataQueries>,

    /// Read-only query validator.
    pub(crate) validator: Arc<SelectQueryValidator>,

    /// Tool router for dispatching tool calls.
    pub(crate) tool_router: ToolRouter<Self>,
}

impl SchemaMcpServer {
    /// Create a server that talks to SQL Server over TDS.
    pub fn new(config: Config) -> Self {
        Self::with_driver(config, Arc::new(TdsDriver::new()))
    }

    /// Create a server with a custom driver.
    pub fn with_driver(config: Config, driver: Arc<dyn SqlDriver>) -> Self {
        let executor = QueryExecutor::new(driver);
        let metadata = Arc::new(MetadataQueries::new(executor.clone()));
        let validator = Arc::new(SelectQueryValidator::new(config.security.max_query_length));

        Self {
            config: Arc::new(config),
            executor,
            metadata,
            validator,
            tool_router: Self::tool_router(),
        }
    }

    /// Create a server from environment variables.
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the query validator.
    pub fn validator(&self) -> &SelectQueryValidator {
        &self.validator
    }

    /// Get the configured database name, if any.
    pub fn current_database(&self) -> Option<&str> {
        self.config.current_database()
    }

    /// Build a fresh descriptor for one tool call.
    pub(crate) fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptorBuilder::new(&self.config.database).build()
    }
}
