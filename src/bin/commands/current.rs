use anyhow::Result;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig};
use serde::Serialize;
use tabled::Tabled;

use super::print_rows;

#[derive(Tabled, Serialize)]
struct CurrentRow {
    schema: String,
    revision: String,
    head: String,
    updated_at: String,
}

pub fn run(config: &SchemaflowConfig, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let record = session.runner.current(&ctx)?;
    let repository = session.runner.repository();

    let revision = record
        .as_ref()
        .and_then(|r| r.revision_id.clone())
        .unwrap_or_else(|| "base".to_string());
    let row = CurrentRow {
        schema: session.schema().to_string(),
        head: repository.head().unwrap_or("base").to_string(),
        updated_at: record
            .as_ref()
            .map(|r| r.updated_at_string())
            .unwrap_or_else(|| "never".to_string()),
        revision,
    };
    print_rows(&[row], format)
}
