//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseConn`: SQLite connection wrapper with schema attach support
//! - `SchemaDefinitions`: DDL for the engine's version table
//! - identifier quoting and schema qualification helpers

mod connection;
mod schema;

pub use connection::{DatabaseConn, DEFAULT_BUSY_TIMEOUT};
pub(crate) use connection::{schema_attached, table_exists_in};
pub use schema::{
    qualify, quote_ident, render_sql, SchemaDefinitions, DEFAULT_VERSION_TABLE,
    SCHEMA_PLACEHOLDER,
};
