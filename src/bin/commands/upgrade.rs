use anyhow::Result;
use clap::Args;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig, Target};

use super::print_report;

/// Arguments for the Upgrade command
#[derive(Args)]
pub struct UpgradeArgs {
    /// Revision to upgrade to: `head`, a revision id or prefix, or `+N`
    #[clap(default_value = "head")]
    pub target: Target,
}

pub fn run(config: &SchemaflowConfig, args: UpgradeArgs, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let report = session.runner.upgrade_to(&ctx, &args.target)?;
    print_report(&report, format)
}
