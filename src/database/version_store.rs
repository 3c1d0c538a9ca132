//! Schema-scoped version bookkeeping
//!
//! The version store records which revision a namespaced schema is at. It
//! lives inside that schema and is addressed only through schema-qualified
//! names, with every statement additionally filtered by `schema_name`.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use crate::database::core::{qualify, quote_ident, table_exists_in, SchemaDefinitions};
use crate::error::MigrationResult;

/// The persisted version record of one schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub schema_name: String,
    /// `None` means the schema is at base
    pub revision_id: Option<String>,
    pub updated_at: i64,
}

impl VersionRecord {
    /// Format the update time for display
    pub fn updated_at_string(&self) -> String {
        chrono::DateTime::from_timestamp(self.updated_at, 0)
            .unwrap_or_default()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
    }
}

/// Version store bound to a single `(schema, table)` pair
pub struct VersionStore<'a> {
    conn: &'a Connection,
    schema: String,
    table: String,
}

impl<'a> VersionStore<'a> {
    pub fn new(conn: &'a Connection, schema: &str, table: &str) -> MigrationResult<Self> {
        quote_ident(schema)?;
        quote_ident(table)?;
        Ok(Self {
            conn,
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    fn qualified_table(&self) -> MigrationResult<String> {
        qualify(&self.schema, &self.table)
    }

    pub fn table_exists(&self) -> MigrationResult<bool> {
        table_exists_in(self.conn, &self.schema, &self.table)
    }

    /// Create the version table if it does not exist yet
    ///
    /// Returns `true` if the table was created by this call.
    pub fn ensure_table(&self) -> MigrationResult<bool> {
        if self.table_exists()? {
            return Ok(false);
        }
        info!(
            "creating version table {}.{}",
            self.schema.as_str(),
            self.table.as_str()
        );
        self.conn
            .execute_batch(&SchemaDefinitions::version_table(&self.schema, &self.table)?)?;
        Ok(true)
    }

    /// Read the current revision; `None` for base or a missing table
    pub fn read(&self) -> MigrationResult<Option<String>> {
        Ok(self.record()?.and_then(|r| r.revision_id))
    }

    /// Read the full version record of this schema, if any
    pub fn record(&self) -> MigrationResult<Option<VersionRecord>> {
        if !self.table_exists()? {
            return Ok(None);
        }
        let query = format!(
            "SELECT schema_name, revision_id, updated_at FROM {} WHERE schema_name = ?1",
            self.qualified_table()?
        );
        let record = self
            .conn
            .query_row(&query, [self.schema.as_str()], |row| {
                Ok(VersionRecord {
                    schema_name: row.get(0)?,
                    revision_id: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Record `revision` as current inside the caller's transaction
    pub fn write(&self, tx: &Transaction<'_>, revision: Option<&str>) -> MigrationResult<()> {
        let query = format!(
            r#"
            INSERT INTO {} (schema_name, revision_id, updated_at)
            VALUES (?1, ?2, strftime('%s', 'now'))
            ON CONFLICT(schema_name) DO UPDATE SET
                revision_id = excluded.revision_id,
                updated_at = excluded.updated_at
            "#,
            self.qualified_table()?
        );
        tx.execute(&query, params![self.schema.as_str(), revision])?;
        debug!(
            "schema {} version set to {}",
            self.schema.as_str(),
            revision.unwrap_or("base")
        );
        Ok(())
    }
}
