//! Wiring of both repositories against DynamoDB.

use aws_sdk_dynamodb::Client;
use grantstore_core::storage::Result;

use crate::config::{create_client, StoreConfig};
use crate::repository::{ClientRepository, GrantRepository};
use crate::storage::dynamodb::DynamoDbTable;
use crate::storage::keys;

/// The client and grant repositories of one deployment.
#[derive(Debug, Clone)]
pub struct Stores {
    pub clients: ClientRepository<DynamoDbTable>,
    pub grants: GrantRepository<DynamoDbTable>,
}

impl Stores {
    /// Builds the SDK client from `config` and both repositories on top of it.
    pub async fn connect(config: &StoreConfig) -> Self {
        let client = create_client(config).await;
        Self::with_client(client, config)
    }

    /// Builds both repositories on an existing SDK client.
    pub fn with_client(client: Client, config: &StoreConfig) -> Self {
        let clients = DynamoDbTable::new(
            client.clone(),
            &config.clients_table,
            keys::client_table_schema(),
        )
        .with_page_size(config.page_size);

        let grants = DynamoDbTable::new(
            client,
            &config.grants_table,
            keys::grant_table_schema(&config.grant_key_index),
        )
        .with_page_size(config.page_size);

        tracing::debug!(
            clients_table = %config.clients_table,
            grants_table = %config.grants_table,
            bulk_delete = %config.bulk_delete,
            "Grant store configured"
        );

        Self {
            clients: ClientRepository::new(clients),
            grants: GrantRepository::new(grants, &config.grant_key_index)
                .with_strategy(config.bulk_delete),
        }
    }

    /// Checks that both tables exist and the grant table carries its key index.
    pub async fn verify(&self) -> Result<()> {
        self.clients.table().verify_schema().await?;
        self.grants.table().verify_schema().await
    }
}
