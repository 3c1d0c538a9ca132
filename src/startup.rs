//! Host startup wiring
//!
//! Opens the configured host database, attaches the managed schema and loads
//! the revision chain from the scripts directory. The CLI uses the same
//! session so both paths see one database handle and one repository.

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use crate::config::SchemaflowConfig;
use crate::database::{ensure_data_dir, DatabaseConn};
use crate::migration::{DirectoryLoader, EnvironmentContext, MigrationReport, MigrationRunner};

/// An opened host database plus the runner for its managed schema
pub struct MigrationSession {
    pub db: DatabaseConn,
    pub runner: MigrationRunner,
    schema: String,
    version_table: String,
}

impl MigrationSession {
    /// Open the database, attach the schema and validate the script chain
    pub fn open(config: &SchemaflowConfig) -> Result<Self> {
        ensure_data_dir(&config.data_dir)?;
        let db = DatabaseConn::open_with_timeout(
            Some(config.database_path.as_str()),
            config.busy_timeout(),
        )?;

        let schema_path = (!config.schema_in_memory()).then_some(config.schema_path.as_str());
        db.attach_schema(&config.schema, schema_path)?;

        let runner = Self::load_runner(&config.scripts_dir)?;
        Ok(Self::new(db, runner, &config.schema, &config.version_table))
    }

    /// Wrap an already configured connection whose schema is attached
    pub fn new(db: DatabaseConn, runner: MigrationRunner, schema: &str, version_table: &str) -> Self {
        Self {
            db,
            runner,
            schema: schema.to_string(),
            version_table: version_table.to_string(),
        }
    }

    fn load_runner(scripts_dir: &str) -> Result<MigrationRunner> {
        if !Path::new(scripts_dir).is_dir() {
            return Err(anyhow!(
                "Scripts directory '{}' does not exist",
                scripts_dir
            ));
        }
        let loader = DirectoryLoader::new(scripts_dir);
        Ok(MigrationRunner::from_loader(&loader)?)
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Build the environment context the runner operations take
    pub fn context(&self) -> Result<EnvironmentContext<'_>> {
        Ok(EnvironmentContext::new(&self.db.conn, &self.schema)?
            .with_version_table(&self.version_table)?)
    }
}

/// Bring the configured schema up to head, as a host does once at startup
pub fn run_startup_migrations(config: &SchemaflowConfig) -> Result<MigrationReport> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let report = session.runner.upgrade_to_head(&ctx)?;
    info!(
        "schema {} is at {} ({} steps applied)",
        report.schema,
        report.to.as_deref().unwrap_or("base"),
        report.steps.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    const ROOMS: &str = "-- revision: a1f0c2\n\
-- revises: base\n\
-- description: rooms\n\
-- migrate:up\n\
CREATE TABLE {schema}.rooms (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n\
-- migrate:down\n\
DROP TABLE {schema}.rooms;\n";

    const MEMBERS: &str = "-- revision: b7d9e4\n\
-- revises: a1f0c2\n\
-- description: members\n\
-- migrate:up\n\
CREATE TABLE {schema}.members (room_id INTEGER NOT NULL, user_id INTEGER NOT NULL);\n\
-- migrate:down\n\
DROP TABLE {schema}.members;\n";

    fn config_in(dir: &Path) -> SchemaflowConfig {
        let scripts = dir.join("migrations");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("001_rooms.sql"), ROOMS).unwrap();
        fs::write(scripts.join("002_members.sql"), MEMBERS).unwrap();

        let values = HashMap::from([(
            "scripts_dir".to_string(),
            scripts.to_string_lossy().to_string(),
        )]);
        SchemaflowConfig::with_data_dir(&dir.to_string_lossy(), &values)
    }

    #[test]
    fn test_startup_upgrades_to_head_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let first = run_startup_migrations(&config).unwrap();
        assert_eq!(first.to.as_deref(), Some("b7d9e4"));
        assert_eq!(first.steps.len(), 2);
        assert!(first.version_table_created);

        let second = run_startup_migrations(&config).unwrap();
        assert!(second.is_noop());
        assert!(!second.version_table_created);
        assert_eq!(second.from.as_deref(), Some("b7d9e4"));
    }

    #[test]
    fn test_schema_objects_land_in_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        run_startup_migrations(&config).unwrap();

        let session = MigrationSession::open(&config).unwrap();
        assert!(session.db.table_exists_in("connect", "rooms").unwrap());
        assert!(!session.db.table_exists_in("main", "rooms").unwrap());
        assert!(Path::new(&config.schema_path).exists());
    }

    #[test]
    fn test_missing_scripts_dir() {
        let dir = tempfile::tempdir().unwrap();
        let values = HashMap::from([(
            "scripts_dir".to_string(),
            dir.path().join("nowhere").to_string_lossy().to_string(),
        )]);
        let config = SchemaflowConfig::with_data_dir(&dir.path().to_string_lossy(), &values);
        let err = run_startup_migrations(&config).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
