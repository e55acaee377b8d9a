//! grantstore CLI entry point.

use anyhow::Context;
use clap::Parser;
use grantstore::{StoreConfig, Stores};
use grantstore_cli::cli::{Cli, Commands};
use grantstore_cli::commands::{run_clients, run_grants};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(std::io::stderr)
        .init();

    let config = StoreConfig::from_env()?;
    tracing::debug!(endpoint = %config.target_display(), "Connecting");
    let stores = Stores::connect(&config).await;

    let output = match cli.command {
        Commands::Clients(command) => {
            run_clients(command.action, &stores.clients, cli.format, cli.quiet).await?
        }
        Commands::Grants(command) => {
            run_grants(command.action, &stores.grants, cli.format, cli.quiet).await?
        }
        Commands::Check => {
            stores
                .verify()
                .await
                .with_context(|| format!("Schema check failed on {}", config.target_display()))?;
            if cli.quiet {
                String::new()
            } else {
                format!(
                    "OK: {} and {} (index {}) on {}",
                    config.clients_table,
                    config.grants_table,
                    config.grant_key_index,
                    config.target_display()
                )
            }
        }
    };

    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}
