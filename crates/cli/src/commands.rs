//! Command execution against the repository contracts.
//!
//! Every function returns the text to print, so the same code runs against
//! DynamoDB from `main` and against in-memory tables in tests.

use std::path::Path;

use anyhow::{bail, Context, Result};
use grantstore_core::client::Client;
use grantstore_core::grant::{GrantType, PersistedGrant};
use grantstore_core::storage::{ClientStore, PersistedGrantStore};

use crate::cli::clients::ClientsAction;
use crate::cli::grants::GrantsAction;
use crate::cli::OutputFormat;
use crate::output::{format_output, pretty};

/// Reads a JSON document from a file, or from stdin for `-`.
async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return tokio::task::spawn_blocking(|| std::io::read_to_string(std::io::stdin()))
            .await?
            .context("Failed to read stdin");
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Runs a client command.
pub async fn run_clients(
    action: ClientsAction,
    store: &impl ClientStore,
    format: OutputFormat,
    quiet: bool,
) -> Result<String> {
    match action {
        ClientsAction::Get { id } => {
            let Some(client) = store.find_by_id(&id).await? else {
                bail!("Client {} not found", id);
            };
            Ok(match format {
                OutputFormat::Json => format_output(&client, format),
                OutputFormat::Pretty => pretty::format_client(&client),
            })
        }
        ClientsAction::Put { file } => {
            let client: Client = serde_json::from_str(&read_input(&file).await?)
                .with_context(|| format!("Invalid client definition in {}", file.display()))?;
            store.store(&client).await?;
            Ok(match format {
                OutputFormat::Json => format_output(&client, format),
                OutputFormat::Pretty if quiet => String::new(),
                OutputFormat::Pretty => format!("Stored:\n{}", pretty::format_client(&client)),
            })
        }
    }
}

/// Runs a grant command.
pub async fn run_grants(
    action: GrantsAction,
    store: &impl PersistedGrantStore,
    format: OutputFormat,
    quiet: bool,
) -> Result<String> {
    match action {
        GrantsAction::List { subject } => {
            let grants = store.get_all(&subject).await?;
            Ok(match format {
                OutputFormat::Json => format_output(&grants, format),
                OutputFormat::Pretty => pretty::format_grants(&grants),
            })
        }
        GrantsAction::Get { key } => {
            let Some(grant) = store.get(&key).await? else {
                bail!("Grant {} not found", key);
            };
            Ok(match format {
                OutputFormat::Json => format_output(&grant, format),
                OutputFormat::Pretty => pretty::format_grant(&grant),
            })
        }
        GrantsAction::Put { file } => {
            let grant: PersistedGrant = serde_json::from_str(&read_input(&file).await?)
                .with_context(|| format!("Invalid grant definition in {}", file.display()))?;
            store.store(&grant).await?;
            Ok(match format {
                OutputFormat::Json => format_output(&grant, format),
                OutputFormat::Pretty if quiet => String::new(),
                OutputFormat::Pretty => format!("Stored:\n{}", pretty::format_grant(&grant)),
            })
        }
        GrantsAction::Remove { key } => {
            store.remove(&key).await?;
            Ok(if quiet {
                String::new()
            } else {
                format!("Removed grant {}", key)
            })
        }
        GrantsAction::Revoke {
            subject,
            client,
            grant_type,
        } => {
            let deleted = match grant_type {
                Some(grant_type) => {
                    store
                        .remove_all_of_type(&subject, &client, &GrantType::from(grant_type))
                        .await?
                }
                None => store.remove_all(&subject, &client).await?,
            };
            Ok(match format {
                OutputFormat::Json => {
                    format_output(&serde_json::json!({ "deleted": deleted }), format)
                }
                OutputFormat::Pretty if quiet => String::new(),
                OutputFormat::Pretty => format!(
                    "Removed {} grant(s) of client {} for subject {}",
                    deleted, client, subject
                ),
            })
        }
    }
}
