//! Grant CLI commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Persisted grant commands.
#[derive(Debug, Parser)]
pub struct GrantsCommand {
    #[command(subcommand)]
    pub action: GrantsAction,
}

/// Available grant actions.
#[derive(Debug, Subcommand)]
pub enum GrantsAction {
    /// List every grant held by a subject.
    List {
        /// Subject ID.
        #[arg(long)]
        subject: String,
    },
    /// Get a grant by key.
    Get {
        /// Grant key.
        key: String,
    },
    /// Create or replace a grant from a JSON definition.
    Put {
        /// Path to the grant JSON, `-` for stdin.
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove a grant by key.
    Remove {
        /// Grant key.
        key: String,
    },
    /// Remove all grants of a client held by a subject.
    Revoke {
        /// Subject ID.
        #[arg(long)]
        subject: String,
        /// Client ID.
        #[arg(long)]
        client: String,
        /// Only remove grants of this type.
        #[arg(long = "type")]
        grant_type: Option<String>,
    },
}
