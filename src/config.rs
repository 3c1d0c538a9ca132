use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::database::DEFAULT_VERSION_TABLE;

/// Schema managed when none is configured
pub const DEFAULT_SCHEMA: &str = "connect";

#[derive(Debug, Clone, Serialize)]
pub struct SchemaflowConfig {
    /// Path to the directory holding the database files
    pub data_dir: String,

    /// Host database file the schema is attached to
    pub database_path: String,

    /// Name of the namespaced schema to manage
    pub schema: String,

    /// File backing the schema; `:memory:` for a throwaway schema
    pub schema_path: String,

    /// Version-tracking table inside the schema
    pub version_table: String,

    /// Directory containing `.sql` revision files
    pub scripts_dir: String,

    /// How long a writer waits for a competing lock (default: 5 seconds)
    pub busy_timeout_ms: u64,
}

const EMPTY_CONFIG: &str = r#"### schemaflow configuration file

### directory for database files
# data_dir = "~/.schemaflow"

### host database and the schema attached to it
# database_path = "~/.schemaflow/host.sqlite3"
# schema = "connect"
# schema_path = "~/.schemaflow/connect.sqlite3"

### version bookkeeping table inside the schema
# version_table = "schema_version"

### directory with .sql revision files
# scripts_dir = "migrations"

### lock wait in milliseconds
# busy_timeout_ms = 5000
"#;

impl Default for SchemaflowConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let data_dir = format!("{}/.schemaflow", home_dir);

        Self::with_data_dir(&data_dir, &HashMap::new())
    }
}

impl SchemaflowConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<SchemaflowConfig> {
        let mut builder = Config::builder();

        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let schemaflow_dir = format!("{}/.schemaflow", home_dir.as_str());

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(schemaflow_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create schemaflow directory: {}", e))?;
                let p = format!("{}/schemaflow.toml", schemaflow_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of SCHEMAFLOW)
        // E.g., `SCHEMAFLOW_SCHEMA=connect schemaflow upgrade` would set the schema
        builder = builder.add_source(config::Environment::with_prefix("SCHEMAFLOW"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        check_values(&config)?;

        let data_dir = match config.get("data_dir") {
            Some(p) => expand_home(p, &home_dir),
            None => schemaflow_dir,
        };

        let cfg = Self::with_data_dir(&data_dir, &config);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fill every setting from `values`, falling back to defaults under `data_dir`
    pub(crate) fn with_data_dir(data_dir: &str, values: &HashMap<String, String>) -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let data_dir = data_dir.trim_end_matches('/').to_string();
        let get = |key: &str| values.get(key).map(|v| expand_home(v, &home_dir));

        let schema = values
            .get("schema")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

        SchemaflowConfig {
            database_path: get("database_path")
                .unwrap_or_else(|| format!("{}/host.sqlite3", data_dir)),
            schema_path: get("schema_path")
                .unwrap_or_else(|| format!("{}/{}.sqlite3", data_dir, schema)),
            schema,
            version_table: values
                .get("version_table")
                .cloned()
                .unwrap_or_else(|| DEFAULT_VERSION_TABLE.to_string()),
            scripts_dir: get("scripts_dir").unwrap_or_else(|| "migrations".to_string()),
            // Parse lock wait (default: 5 seconds)
            busy_timeout_ms: values
                .get("busy_timeout_ms")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(5000),
            data_dir,
        }
    }

    fn validate(&self) -> Result<()> {
        crate::database::quote_ident(&self.schema)
            .map_err(|e| anyhow!("Invalid schema name in configuration: {}", e))?;
        crate::database::quote_ident(&self.version_table)
            .map_err(|e| anyhow!("Invalid version table in configuration: {}", e))?;
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Whether the schema lives in memory only (useful for dry experiments)
    pub fn schema_in_memory(&self) -> bool {
        self.schema_path == ":memory:"
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("Database Path:      {}", self.database_path),
            format!("Schema:             {}", self.schema),
            format!("Schema Path:        {}", self.schema_path),
            format!("Version Table:      {}", self.version_table),
            format!("Scripts Directory:  {}", self.scripts_dir),
            format!("Busy Timeout:       {} ms", self.busy_timeout_ms),
        ]
        .join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.schemaflow/schemaflow.toml", home_dir)
    }
}

/// Reject raw values that would otherwise fall back to a default
fn check_values(values: &HashMap<String, String>) -> Result<()> {
    if let Some(raw) = values.get("busy_timeout_ms") {
        raw.trim().parse::<u64>().map_err(|_| {
            anyhow!(
                "Invalid busy_timeout_ms in configuration: '{}' is not a number of milliseconds",
                raw
            )
        })?;
    }
    Ok(())
}

fn expand_home(path: &str, home_dir: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{}/{}", home_dir.trim_end_matches('/'), rest),
        None => path.to_string(),
    }
}
