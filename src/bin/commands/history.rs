use anyhow::Result;
use clap::Args;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig};
use serde::Serialize;
use tabled::Tabled;

use super::print_rows;

/// Arguments for the History command
#[derive(Args)]
pub struct HistoryArgs {
    /// List from head down to base instead
    #[clap(short, long)]
    pub reverse: bool,
}

#[derive(Tabled, Serialize)]
struct HistoryRow {
    revision: String,
    revises: String,
    description: String,
    current: String,
}

pub fn run(config: &SchemaflowConfig, args: HistoryArgs, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let current = session
        .runner
        .current(&ctx)?
        .and_then(|r| r.revision_id);

    if session.runner.repository().is_empty() {
        println!("no revisions found in {}", config.scripts_dir);
        return Ok(());
    }

    let mut rows: Vec<HistoryRow> = session
        .runner
        .history()
        .map(|s| HistoryRow {
            revision: s.revision().to_string(),
            revises: s.parent().unwrap_or("base").to_string(),
            description: s.description().to_string(),
            current: if current.as_deref() == Some(s.revision()) {
                "*".to_string()
            } else {
                String::new()
            },
        })
        .collect();
    if args.reverse {
        rows.reverse();
    }
    print_rows(&rows, format)
}
