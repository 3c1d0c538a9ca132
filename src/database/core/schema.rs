//! Schema definitions for the engine's own bookkeeping
//!
//! Everything the engine creates lives inside the target schema and every
//! reference to it is schema-qualified, so an identically named table in
//! `main` or in another attached schema is never touched.

use crate::error::{MigrationError, MigrationResult};

/// Default name of the version-tracking table
pub const DEFAULT_VERSION_TABLE: &str = "schema_version";

/// Placeholder replaced by the quoted schema name in SQL scripts
pub const SCHEMA_PLACEHOLDER: &str = "{schema}";

/// SQL templates for the version-tracking table
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Create the version table for `schema`.
    ///
    /// One row per schema: `revision_id` is NULL when the schema is at base.
    pub fn version_table(schema: &str, table: &str) -> MigrationResult<String> {
        Ok(format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                schema_name TEXT PRIMARY KEY,
                revision_id TEXT,
                updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
            );
            "#,
            qualify(schema, table)?
        ))
    }
}

/// Quote an SQLite identifier
///
/// Only non-empty names made of ASCII letters, digits, `_` and `-` are
/// accepted; anything else is rejected rather than escaped.
pub fn quote_ident(name: &str) -> MigrationResult<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(MigrationError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name))
}

/// Build a schema-qualified, quoted object name: `"schema"."name"`
pub fn qualify(schema: &str, name: &str) -> MigrationResult<String> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(name)?))
}

/// Substitute the schema placeholder in an SQL script body
pub fn render_sql(sql: &str, schema: &str) -> MigrationResult<String> {
    Ok(sql.replace(SCHEMA_PLACEHOLDER, &quote_ident(schema)?))
}
