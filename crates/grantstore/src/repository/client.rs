//! Client registrations, one item per client identifier.

use async_trait::async_trait;
use chrono::Utc;

use grantstore_core::client::{validate_client, Client};
use grantstore_core::storage::{ClientStore, Result};

use super::first_item;
use crate::storage::conversions::{client_to_item, item_to_client};
use crate::storage::{DocumentTable, KeyQuery};

/// [`ClientStore`] backed by a document table keyed by `clientId`.
#[derive(Debug, Clone)]
pub struct ClientRepository<T> {
    table: T,
}

impl<T: DocumentTable> ClientRepository<T> {
    pub fn new(table: T) -> Self {
        Self { table }
    }

    /// The underlying table.
    pub fn table(&self) -> &T {
        &self.table
    }
}

#[async_trait]
impl<T: DocumentTable> ClientStore for ClientRepository<T> {
    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>> {
        if client_id.is_empty() {
            tracing::debug!("Empty client id, skipping lookup");
            return Ok(None);
        }

        let item = first_item(&self.table, &KeyQuery::partition(client_id))
            .await
            .inspect_err(|e| tracing::error!(%client_id, error = %e, "Failed to find client"))?;

        item.map(|item| item_to_client(&item))
            .transpose()
            .inspect_err(|e| tracing::error!(%client_id, error = %e, "Failed to read client"))
    }

    async fn store(&self, client: &Client) -> Result<()> {
        validate_client(client)?;

        let client_id = client.client_id.as_str();
        let item = client_to_item(client, Utc::now())
            .inspect_err(|e| tracing::error!(%client_id, error = %e, "Failed to encode client"))?;

        self.table
            .put(item)
            .await
            .inspect_err(|e| tracing::error!(%client_id, error = %e, "Failed to store client"))
    }
}
