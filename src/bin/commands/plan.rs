use anyhow::Result;
use clap::Args;
use schemaflow::output::display_revision;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig, Target};
use serde_json::json;

use super::print_rows;

/// Arguments for the Plan command
#[derive(Args)]
pub struct PlanArgs {
    /// Revision to plan for: `head`, `base`, a revision id or prefix, or `+N`/`-N`
    #[clap(allow_hyphen_values = true)]
    pub target: Target,
}

pub fn run(config: &SchemaflowConfig, args: PlanArgs, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let plan = session.runner.plan(&ctx, &args.target)?;
    let steps = plan.describe();

    if format.is_json() {
        let value = json!({
            "schema": session.schema(),
            "from": plan.from,
            "to": plan.to,
            "steps": steps,
        });
        println!("{}", format.to_json(&value)?);
        return Ok(());
    }

    if steps.is_empty() {
        println!("nothing to do, schema at {}", display_revision(&plan.to));
        return Ok(());
    }
    print_rows(&steps, format)?;
    println!(
        "{} -> {} ({} steps)",
        display_revision(&plan.from),
        display_revision(&plan.to),
        steps.len()
    );
    Ok(())
}
