#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Schemaflow - versioned migrations for namespaced SQLite schemas
//!
//! Schemaflow keeps one module's tables in their own schema, attached to the
//! host's shared SQLite connection, and moves that schema along a linear
//! chain of revisions. It can be used as a library called at host startup
//! and as a command-line tool for operators.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Engine, config and startup helper | `rusqlite`, `tracing` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | The `schemaflow` binary | All above + `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! schemaflow = { version = "0.3", default-features = false }
//!
//! # Default (CLI binary)
//! schemaflow = "0.3"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: connection wrapper, schema attach, version store
//! - **[`migration`]**: scripts, repository, plans, executor and runner
//! - **[`config`]**: configuration file and environment handling
//! - **[`startup`]**: one-call wiring for host startup
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use schemaflow::{run_startup_migrations, SchemaflowConfig};
//!
//! let config = SchemaflowConfig::new(&None)?;
//! let report = run_startup_migrations(&config)?;
//! println!("{} is at {:?}", report.schema, report.to);
//! ```
//!
//! Hosts that already own a connection build the pieces themselves:
//!
//! ```rust,ignore
//! use schemaflow::database::DatabaseConn;
//! use schemaflow::migration::{DirectoryLoader, EnvironmentContext, MigrationRunner};
//!
//! let db = DatabaseConn::open_path("host.sqlite3")?;
//! db.attach_schema("connect", Some("connect.sqlite3"))?;
//!
//! let runner = MigrationRunner::from_loader(&DirectoryLoader::new("migrations"))?;
//! let ctx = EnvironmentContext::new(&db.conn, "connect")?;
//! runner.upgrade_to_head(&ctx)?;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod migration;
pub mod output;
pub mod startup;

// =============================================================================
// Configuration
// =============================================================================

pub use config::SchemaflowConfig;

// =============================================================================
// Database
// =============================================================================

pub use database::{DatabaseConn, SchemaDefinitions, VersionRecord, VersionStore};

// =============================================================================
// Migration engine
// =============================================================================

pub use error::{MigrationError, MigrationResult};
pub use migration::{
    Direction, DirectoryLoader, EnvironmentContext, ExecutionPlan, FnScript, MigrationContext,
    MigrationReport, MigrationRepository, MigrationRunner, MigrationScript, ScriptLoader,
    SqlScript, StaticLoader, Target,
};
pub use startup::{run_startup_migrations, MigrationSession};

pub use output::OutputFormat;
