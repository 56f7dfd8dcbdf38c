//! Connection descriptors for SQL Server.
//!
//! A [`ConnectionDescriptor`] is built fresh for every tool invocation from the
//! process [`DatabaseConfig`] and dropped when the invocation finishes. There is
//! no shared connection state.

use crate::config::DatabaseConfig;
use crate::constants::{APPLICATION_NAME, DEFAULT_PORT};
use crate::error::ServerError;
use std::fmt;
use tiberius::{AuthMethod, Config, EncryptionLevel};

const REDACTED: &str = "***";

/// Everything needed to open one connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    /// Server address as configured (`host`, `host,port`, `host\instance`).
    pub server: String,
    /// Database name; `None` uses the login's default database.
    pub database: Option<String>,
    /// SQL Server login.
    pub username: String,
    /// SQL Server password.
    pub password: String,
    /// Accept the server certificate without validation.
    pub trust_server_certificate: bool,
    /// Encrypt the whole session.
    pub encrypt: bool,
    /// ODBC driver name used by [`ConnectionDescriptor::connection_string`].
    pub odbc_driver: String,
}

/// Builds [`ConnectionDescriptor`]s from the database configuration.
///
/// Building never fails: missing values stay empty and the driver rejects the
/// login when a connection is attempted.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptorBuilder<'a> {
    config: &'a DatabaseConfig,
}

impl<'a> ConnectionDescriptorBuilder<'a> {
    /// Create a builder over the given configuration.
    pub fn new(config: &'a DatabaseConfig) -> Self {
        Self { config }
    }

    /// Build the descriptor. The configured credentials only ever travel to
    /// the configured server.
    pub fn build(self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            server: self.config.server.clone(),
            database: self.config.database.clone(),
            username: self.config.username.clone(),
            password: self.config.password.clone(),
            trust_server_certificate: self.config.trust_server_certificate,
            encrypt: self.config.encrypt,
            odbc_driver: self.config.odbc_driver.clone(),
        }
    }
}

impl ConnectionDescriptor {
    /// Render the ODBC connection string, including the clear password.
    pub fn connection_string(&self) -> String {
        self.render(&self.password)
    }

    /// Render the ODBC connection string with the password masked.
    pub fn redacted_connection_string(&self) -> String {
        self.render(REDACTED)
    }

    fn render(&self, password: &str) -> String {
        let database_part = match self.database.as_deref() {
            Some(db) if !db.is_empty() => format!("Database={};", db),
            _ => String::new(),
        };
        format!(
            "Driver={{{}}};Server={};{}Uid={};Pwd={};TrustServerCertificate={}",
            self.odbc_driver,
            self.server,
            database_part,
            self.username,
            password,
            if self.trust_server_certificate { "Yes" } else { "No" }
        )
    }

    /// Split the server address into host, port and instance name.
    pub fn endpoint(&self) -> Result<ServerEndpoint, ServerError> {
        ServerEndpoint::parse(&self.server)
    }

    /// Create a tiberius Config for this descriptor.
    ///
    /// A named instance without an explicit port targets the SQL Browser
    /// service; the driver resolves the instance port through it.
    pub fn tds_config(&self) -> Result<Config, ServerError> {
        let endpoint = self.endpoint()?;
        let mut config = Config::new();

        config.host(&endpoint.host);
        match (&endpoint.instance, endpoint.port) {
            (Some(instance), None) => config.instance_name(instance),
            (_, port) => config.port(port.unwrap_or(DEFAULT_PORT)),
        }

        if let Some(database) = self.database.as_deref().filter(|d| !d.is_empty()) {
            config.database(database);
        }

        config.authentication(AuthMethod::sql_server(&self.username, &self.password));

        if self.encrypt {
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::Off);
        }

        if self.trust_server_certificate {
            config.trust_cert();
        }

        config.application_name(APPLICATION_NAME);

        Ok(config)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("encrypt", &self.encrypt)
            .field("odbc_driver", &self.odbc_driver)
            .finish()
    }
}

/// Parsed form of a server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerEndpoint {
    /// Parse `host`, `host,port`, `host\instance` or `host\instance,port`,
    /// with an optional `tcp:` prefix. `.` and `(local)` mean localhost.
    pub fn parse(server: &str) -> Result<Self, ServerError> {
        let trimmed = server.trim();
        let trimmed = trimmed
            .strip_prefix("tcp:")
            .or_else(|| trimmed.strip_prefix("TCP:"))
            .unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Err(ServerError::connection("No server address configured"));
        }

        let (address, port) = match trimmed.rsplit_once(',') {
            Some((address, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    ServerError::connection(format!("Invalid port in server address: {}", server))
                })?;
                (address.trim(), Some(port))
            }
            None => (trimmed, None),
        };

        let (host, instance) = match address.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (address, None),
        };

        let host = match host {
            "." | "(local)" | "(localdb)" => "localhost",
            other => other,
        };

        if host.is_empty() {
            return Err(ServerError::connection(format!(
                "Invalid server address: {}",
                server
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            instance,
        })
    }

    /// Whether the TCP port has to be looked up through the SQL Browser
    /// service. An explicit port always wins over the instance name.
    pub fn needs_browser(&self) -> bool {
        self.instance.is_some() && self.port.is_none()
    }
}
