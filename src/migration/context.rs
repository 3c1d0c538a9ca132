//! Environment and per-step contexts
//!
//! [`EnvironmentContext`] is what the host hands to the engine: a borrowed
//! connection and the name of the schema to manage. Nothing in the engine
//! opens connections or picks schemas on its own, and no process-wide
//! logging state is touched; engine events are emitted inside the context's
//! own span so the host's subscriber decides what happens to them.
//!
//! [`MigrationContext`] is what a script sees while it runs: the open
//! transaction for its step and helpers to address its own schema.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, Params, Transaction, TransactionBehavior};
use tracing::{info_span, Span};

use crate::database::core::{
    qualify, quote_ident, render_sql, schema_attached, DEFAULT_VERSION_TABLE,
};
use crate::database::VersionStore;
use crate::error::{MigrationError, MigrationResult};

/// Connection, schema and transaction boundaries for one engine invocation
pub struct EnvironmentContext<'a> {
    conn: &'a Connection,
    schema: String,
    version_table: String,
    span: Span,
}

impl<'a> EnvironmentContext<'a> {
    /// Create a context for `schema`, which must already be attached to `conn`
    pub fn new(conn: &'a Connection, schema: &str) -> MigrationResult<Self> {
        quote_ident(schema)?;
        if !schema_attached(conn, schema)? {
            return Err(MigrationError::SchemaNotFound(schema.to_string()));
        }
        Ok(Self {
            conn,
            schema: schema.to_string(),
            version_table: DEFAULT_VERSION_TABLE.to_string(),
            span: info_span!("migrations", schema = schema),
        })
    }

    /// Use a different table name for version bookkeeping
    pub fn with_version_table(mut self, table: &str) -> MigrationResult<Self> {
        quote_ident(table)?;
        self.version_table = table.to_string();
        Ok(self)
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn version_table(&self) -> &str {
        &self.version_table
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn version_store(&self) -> MigrationResult<VersionStore<'a>> {
        VersionStore::new(self.conn, &self.schema, &self.version_table)
    }

    /// Begin a write transaction for one migration step
    ///
    /// `IMMEDIATE` takes the write lock up front, so a second writer waits
    /// for the busy timeout instead of interleaving with this step.
    pub fn begin(&self) -> MigrationResult<Transaction<'a>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Schema-qualified, quoted name of an object in the managed schema
    pub fn qualify(&self, name: &str) -> MigrationResult<String> {
        qualify(&self.schema, name)
    }
}

/// What a script receives while its step runs
pub struct MigrationContext<'a> {
    tx: &'a Transaction<'a>,
    schema: &'a str,
}

impl<'a> MigrationContext<'a> {
    pub fn new(tx: &'a Transaction<'a>, schema: &'a str) -> Self {
        Self { tx, schema }
    }

    /// The open transaction of this step
    pub fn transaction(&self) -> &Transaction<'a> {
        self.tx
    }

    pub fn schema(&self) -> &str {
        self.schema
    }

    /// Schema-qualified, quoted name: `"connect"."profiles"`
    pub fn table(&self, name: &str) -> Result<String> {
        Ok(qualify(self.schema, name)?)
    }

    /// Execute one statement; `{schema}` is replaced with the quoted schema
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let sql = render_sql(sql, self.schema)?;
        self.tx
            .execute(&sql, params)
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Execute several statements; `{schema}` is replaced with the quoted schema
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = render_sql(sql, self.schema)?;
        self.tx
            .execute_batch(&sql)
            .map_err(|e| anyhow!("Failed to execute SQL batch: {}", e))
    }
}
