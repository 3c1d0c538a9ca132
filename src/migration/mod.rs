//! Migration engine
//!
//! ```text
//! migration/
//! ├── script      # MigrationScript trait, FnScript, SqlScript
//! ├── loader      # ScriptLoader: static and directory discovery
//! ├── repository  # revision graph validation and plan resolution
//! ├── plan        # Target, Direction, ExecutionPlan
//! ├── context     # EnvironmentContext (host side), MigrationContext (script side)
//! ├── executor    # one transaction per step, stop at first failure
//! └── runner      # upgrade_to_head, downgrade_to, stamp, ...
//! ```
//!
//! # Usage
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
//! let report = runner.upgrade_to_head(&ctx)?;
//! ```

mod context;
mod executor;
mod loader;
mod plan;
mod repository;
mod runner;
mod script;

pub use context::{EnvironmentContext, MigrationContext};
pub use executor::{ExecutedStep, Executor};
pub use loader::{parse_sql_script, DirectoryLoader, ScriptLoader, StaticLoader};
pub use plan::{Direction, ExecutionPlan, PlanStep, PlannedStep, Target};
pub use repository::MigrationRepository;
pub use runner::{MigrationReport, MigrationRunner};
pub use script::{FnScript, MigrationScript, SqlScript};
