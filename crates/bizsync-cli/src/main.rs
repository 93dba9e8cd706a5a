//! Bizsync CLI - device-side client for local-network record sync
//!
//! Announces this machine, lists nearby peers and pushes record batches
//! through the duplicate gate.

mod cli;
mod client;
mod commands;
mod error;
mod identity;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::client::DeviceClient;
use crate::commands::completions::run_completions;
use crate::commands::discover::run_discover;
use crate::commands::push::run_push;
use crate::commands::register::run_register;
use crate::commands::unregister::run_unregister;
use crate::error::CliError;
use crate::identity::DeviceIdentity;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bizsync_cli=warn".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let identity = DeviceIdentity::resolve(cli.device_id, cli.device_name)?;
    let client = DeviceClient::new(&cli.api_url, identity)?;

    match cli.command {
        Commands::Register => run_register(&client).await?,
        Commands::Discover { json } => run_discover(&client, json).await?,
        Commands::Push { file, json } => run_push(&client, &file, json).await?,
        Commands::Unregister => run_unregister(&client).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
