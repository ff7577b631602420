//! knn-explorer - Main Entry Point
//!
//! Renders the k-NN explorer page from the command line.

use clap::Parser;
use knn_explorer::cli::{cmd_columns, cmd_interactive, cmd_run, cmd_seal, Cli, Commands, PageArgs};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knn_explorer=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => {
            cmd_run(&args)?;
        }
        Some(Commands::Interactive(args)) => {
            cmd_interactive(&args)?;
        }
        Some(Commands::Columns { data, catalog }) => {
            cmd_columns(data.as_deref(), catalog.as_deref())?;
        }
        Some(Commands::Seal { input, output, key }) => {
            cmd_seal(&input, &output, key.as_deref())?;
        }
        None => {
            // Default: interactive mode with flags taken from the environment
            cmd_interactive(&PageArgs {
                user: std::env::var(knn_explorer::cli::USER_ENV).ok(),
                ..PageArgs::default()
            })?;
        }
    }

    Ok(())
}
