//! # MSSQL Schema MCP Server
//!
//! A Model Context Protocol (MCP) server for Microsoft SQL Server schema
//! introspection and read-only querying.
//!
//! This crate provides three tools:
//! - **get_databases**: List user databases on the server
//! - **get_database_schema**: Tables, columns and key flags from the catalog
//! - **execute_select_query**: Run a single validated SELECT with named parameters
//!
//! ## Architecture
//!
//! Each tool call builds its own connection descriptor from the process
//! configuration, opens one connection through a [`database::SqlDriver`],
//! runs one statement and closes the connection. Nothing is cached or pooled.

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handlers;
pub mod security;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::{ErrorPayload, ServerError};
pub use server::SchemaMcpServer;
