//! CLI command definitions.

pub mod clients;
pub mod grants;

use clap::{Parser, Subcommand, ValueEnum};

/// Inspect and maintain OAuth client and grant tables.
#[derive(Debug, Parser)]
#[command(name = "grantstore")]
#[command(about = "Inspect and maintain OAuth client and grant tables", long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    /// Log filter, e.g. `grantstore=debug`.
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Client registrations.
    Clients(clients::ClientsCommand),
    /// Persisted grants.
    Grants(grants::GrantsCommand),
    /// Verify that both tables and the key index exist.
    Check,
}
