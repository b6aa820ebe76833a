//! Talent Retention - Main Entry Point
//!
//! Train, batch-predict, inspect, serve or run the interactive form.

use clap::Parser;
use talent_retention::cli::{
    cmd_inspect, cmd_interactive, cmd_predict, cmd_serve, cmd_train, Cli, Commands, TrainArgs, BUNDLE_FILE,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talent_retention=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, target, identifier, output, seed, test_size, n_estimators }) => {
            cmd_train(TrainArgs {
                data: &data,
                target: &target,
                identifier: &identifier,
                output: &output,
                seed,
                test_size,
                n_estimators,
            })?;
        }
        Some(Commands::Predict { bundle, data, output }) => {
            cmd_predict(&bundle, &data, output.as_deref())?;
        }
        Some(Commands::Inspect { bundle }) => {
            cmd_inspect(&bundle)?;
        }
        Some(Commands::Serve { bundle, port, host, users }) => {
            cmd_serve(&bundle, &host, port, users.as_deref()).await?;
        }
        Some(Commands::Interactive { bundle, users }) => {
            cmd_interactive(&bundle, users.as_deref())?;
        }
        None => {
            // Default: interactive form over the bundle in the working directory
            cmd_interactive(std::path::Path::new(BUNDLE_FILE), None)?;
        }
    }

    Ok(())
}
