//! Database module
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper, schema attach
//! │   └── schema      # version table DDL, identifier quoting
//! │
//! └── version_store   # per-schema revision bookkeeping
//! ```
//!
//! # Namespaced schemas
//!
//! The host owns one SQLite connection. Each module that manages its own
//! tables gets a schema attached to that connection (`ATTACH DATABASE ... AS
//! "connect"`), and every statement the engine issues names its objects as
//! `"connect"."table"`. The version table therefore exists once per schema,
//! and a table of the same name in `main` or in another schema is a
//! different object.
//!
//! ```rust,ignore
//! use schemaflow::database::{DatabaseConn, VersionStore};
//!
//! let db = DatabaseConn::open_path("host.sqlite3")?;
//! db.attach_schema("connect", Some("connect.sqlite3"))?;
//!
//! let store = VersionStore::new(&db.conn, "connect", "schema_version")?;
//! println!("connect is at {:?}", store.read()?);
//! ```

pub mod core;
mod version_store;

pub use core::{
    qualify, quote_ident, DatabaseConn, SchemaDefinitions, DEFAULT_BUSY_TIMEOUT,
    DEFAULT_VERSION_TABLE,
};
pub use version_store::{VersionRecord, VersionStore};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
