use anyhow::Result;
use clap::Args;
use schemaflow::output::display_revision;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig, Target};
use serde_json::json;

/// Arguments for the Stamp command
#[derive(Args)]
pub struct StampArgs {
    /// Revision to record: `head`, `base`, or a revision id or prefix
    #[clap(allow_hyphen_values = true)]
    pub target: Target,
}

pub fn run(config: &SchemaflowConfig, args: StampArgs, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let revision = session.runner.stamp(&ctx, &args.target)?;

    if format.is_json() {
        let value = json!({ "schema": session.schema(), "revision": revision });
        println!("{}", format.to_json(&value)?);
    } else {
        println!(
            "stamped schema {} at {}",
            session.schema(),
            display_revision(&revision)
        );
    }
    Ok(())
}
