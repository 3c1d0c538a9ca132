pub mod current;
pub mod downgrade;
pub mod history;
pub mod plan;
pub mod stamp;
pub mod upgrade;

use anyhow::Result;
use schemaflow::output::display_revision;
use schemaflow::{MigrationReport, OutputFormat};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Print rows as a table or as JSON, depending on the output format
pub(crate) fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows).with(Style::rounded())),
        OutputFormat::Markdown => println!("{}", Table::new(rows).with(Style::markdown())),
        OutputFormat::Json | OutputFormat::JsonPretty => println!("{}", format.to_json(rows)?),
    }
    Ok(())
}

/// Print the outcome of an upgrade or downgrade
pub(crate) fn print_report(report: &MigrationReport, format: OutputFormat) -> Result<()> {
    if format.is_json() {
        println!("{}", format.to_json(report)?);
        return Ok(());
    }

    if report.is_noop() {
        println!(
            "schema {} already at {}",
            report.schema,
            display_revision(&report.to)
        );
        return Ok(());
    }

    print_rows(&report.steps, format)?;
    println!(
        "schema {}: {} -> {} ({} steps)",
        report.schema,
        display_revision(&report.from),
        display_revision(&report.to),
        report.steps.len()
    );
    Ok(())
}
