use anyhow::Result;
use clap::Args;
use schemaflow::{MigrationSession, OutputFormat, SchemaflowConfig, Target};

use super::print_report;

/// Arguments for the Downgrade command
#[derive(Args)]
pub struct DowngradeArgs {
    /// Revision to downgrade to: `base`, a revision id or prefix, or `-N`
    #[clap(allow_hyphen_values = true)]
    pub target: Target,
}

pub fn run(config: &SchemaflowConfig, args: DowngradeArgs, format: OutputFormat) -> Result<()> {
    let session = MigrationSession::open(config)?;
    let ctx = session.context()?;
    let report = session.runner.downgrade_to(&ctx, &args.target)?;
    print_report(&report, format)
}
