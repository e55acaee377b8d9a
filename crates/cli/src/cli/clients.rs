//! Client CLI commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Client registration commands.
#[derive(Debug, Parser)]
pub struct ClientsCommand {
    #[command(subcommand)]
    pub action: ClientsAction,
}

/// Available client actions.
#[derive(Debug, Subcommand)]
pub enum ClientsAction {
    /// Get a client by ID.
    Get {
        /// Client ID.
        id: String,
    },
    /// Create or replace a client from a JSON definition.
    Put {
        /// Path to the client JSON, `-` for stdin.
        #[arg(long)]
        file: PathBuf,
    },
}
