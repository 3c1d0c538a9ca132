//! Database connection management
//!
//! This module provides the connection wrapper a host uses to open its shared
//! database and attach namespaced schemas to it.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::time::Duration;

use super::schema::quote_ident;
use crate::error::MigrationResult;

/// Default time a writer waits for a competing lock before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Core database connection wrapper
///
/// `DatabaseConn` is a thin wrapper around the host's SQLite connection,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling. Namespaced schemas are attached to
/// this single connection, so every module shares the host's database
/// handle instead of opening its own.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a database with an explicit busy timeout
    pub fn open_with_timeout(path: Option<&str>, busy_timeout: Duration) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure(busy_timeout)?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn configure(&self, busy_timeout: Duration) -> Result<()> {
        // Enable WAL mode for better concurrent read/write performance
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        // Competing writers wait instead of failing immediately
        self.conn
            .busy_timeout(busy_timeout)
            .map_err(|e| anyhow!("Failed to set busy timeout: {}", e))?;

        Ok(())
    }

    /// Attach a namespaced schema to this connection
    ///
    /// If `path` is `None`, the schema is backed by a private in-memory
    /// database. Attaching a schema that is already attached is a no-op.
    pub fn attach_schema(&self, schema: &str, path: Option<&str>) -> Result<()> {
        if self.schema_exists(schema)? {
            return Ok(());
        }
        let quoted = quote_ident(schema)?;
        let target = path.unwrap_or(":memory:");
        self.conn
            .execute(&format!("ATTACH DATABASE ?1 AS {}", quoted), [target])
            .map_err(|e| anyhow!("Failed to attach schema '{}' at '{}': {}", schema, target, e))?;
        Ok(())
    }

    /// Detach a previously attached schema
    pub fn detach_schema(&self, schema: &str) -> Result<()> {
        let quoted = quote_ident(schema)?;
        self.conn
            .execute(&format!("DETACH DATABASE {}", quoted), [])
            .map_err(|e| anyhow!("Failed to detach schema '{}': {}", schema, e))?;
        Ok(())
    }

    /// Check whether a schema is attached (`main` and `temp` always are)
    pub fn schema_exists(&self, schema: &str) -> Result<bool> {
        Ok(schema_attached(&self.conn, schema)?)
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Check if a table exists inside the given schema
    pub fn table_exists_in(&self, schema: &str, table_name: &str) -> Result<bool> {
        Ok(table_exists_in(&self.conn, schema, table_name)?)
    }

    /// List the names of all user objects (tables, indexes, views, triggers)
    /// in the given schema
    pub fn objects_in(&self, schema: &str) -> Result<Vec<String>> {
        let quoted = quote_ident(schema)?;
        let query = format!(
            "SELECT name FROM {}.sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY name",
            quoted
        );
        let mut stmt = self
            .conn
            .prepare(&query)
            .map_err(|e| anyhow!("Failed to list objects in '{}': {}", schema, e))?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| anyhow!("Failed to read object names: {}", e))?;
        Ok(names)
    }
}

/// Check whether `schema` is attached to `conn`
pub(crate) fn schema_attached(conn: &Connection, schema: &str) -> MigrationResult<bool> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_database_list")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == schema))
}

/// Check whether `table_name` exists inside `schema`
pub(crate) fn table_exists_in(
    conn: &Connection,
    schema: &str,
    table_name: &str,
) -> MigrationResult<bool> {
    let quoted = quote_ident(schema)?;
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type='table' AND name=?1",
            quoted
        ),
        [table_name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
