use clap::{Parser, Subcommand};
use schemaflow::*;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.schemaflow/schemaflow.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table (default), markdown, json, json-pretty
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade the schema to a revision (default: head)
    Upgrade(commands::upgrade::UpgradeArgs),

    /// Downgrade the schema to a revision, `base`, or `-N` steps back
    Downgrade(commands::downgrade::DowngradeArgs),

    /// Show the revision the schema is at
    Current,

    /// List the revision chain from base to head
    History(commands::history::HistoryArgs),

    /// Show the steps a migration to TARGET would run, without running them
    Plan(commands::plan::PlanArgs),

    /// Record a revision as current without running any script
    Stamp(commands::stamp::StampArgs),

    /// Print the effective configuration
    Config,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level INFO or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match SchemaflowConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    let result = match cli.command {
        Commands::Upgrade(args) => commands::upgrade::run(&config, args, format),
        Commands::Downgrade(args) => commands::downgrade::run(&config, args, format),
        Commands::Current => commands::current::run(&config, format),
        Commands::History(args) => commands::history::run(&config, args, format),
        Commands::Plan(args) => commands::plan::run(&config, args, format),
        Commands::Stamp(args) => commands::stamp::run(&config, args, format),
        Commands::Config => {
            println!("{}", config.summary());
            println!(
                "Config File:        {}",
                cli.config
                    .clone()
                    .unwrap_or_else(SchemaflowConfig::config_file_path)
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// 2 for a target the operator can correct, 1 for everything else
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<MigrationError>() {
        Some(e) if !e.is_fatal() => 2,
        _ => 1,
    }
}
