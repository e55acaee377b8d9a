//! Store configuration loaded from environment variables.

use std::{env, fmt, str::FromStr};

use aws_sdk_dynamodb::Client;
use thiserror::Error;

use crate::storage::keys::DEFAULT_GRANT_KEY_INDEX;

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How `remove_all` finds the grants to delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BulkDeleteStrategy {
    /// Full-table scan filtered on subject, client and type. Cost grows with
    /// the table size.
    #[default]
    Scan,
    /// Query of the subject's partition filtered on client and type.
    PartitionQuery,
}

impl BulkDeleteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkDeleteStrategy::Scan => "scan",
            BulkDeleteStrategy::PartitionQuery => "partition",
        }
    }
}

impl fmt::Display for BulkDeleteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkDeleteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(BulkDeleteStrategy::Scan),
            "partition" | "partition-query" => Ok(BulkDeleteStrategy::PartitionQuery),
            other => Err(format!("expected scan or partition, got {other}")),
        }
    }
}

/// Configuration of the two tables and the DynamoDB client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Client table name (default: "identity_clients")
    pub clients_table: String,
    /// Grant table name (default: "identity_persisted_grants")
    pub grants_table: String,
    /// Key-only index on the grant table (default: "KeyIndex")
    pub grant_key_index: String,
    /// Bulk delete strategy (default: scan)
    pub bulk_delete: BulkDeleteStrategy,
    /// Items evaluated per query/scan page; `None` leaves it to the store.
    pub page_size: Option<i32>,
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1")
    pub region: String,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GRANTSTORE_CLIENTS_TABLE` - Client table (default: "identity_clients")
    /// - `GRANTSTORE_GRANTS_TABLE` - Grant table (default: "identity_persisted_grants")
    /// - `GRANTSTORE_GRANT_KEY_INDEX` - Key-only index (default: "KeyIndex")
    /// - `GRANTSTORE_BULK_DELETE` - `scan` or `partition` (default: "scan")
    /// - `GRANTSTORE_PAGE_SIZE` - Page limit, positive integer (default: unset)
    /// - `AWS_ENDPOINT_URL` - Custom DynamoDB endpoint (default: unset)
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bulk_delete = match lookup("GRANTSTORE_BULK_DELETE").filter(|v| !v.is_empty()) {
            Some(value) => value
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: "GRANTSTORE_BULK_DELETE",
                    value,
                    reason,
                })?,
            None => BulkDeleteStrategy::default(),
        };

        let page_size = match lookup("GRANTSTORE_PAGE_SIZE").filter(|v| !v.is_empty()) {
            Some(value) => Some(parse_page_size(&value).ok_or_else(|| {
                ConfigError::InvalidValue {
                    name: "GRANTSTORE_PAGE_SIZE",
                    value,
                    reason: "expected a positive integer".to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            clients_table: var("GRANTSTORE_CLIENTS_TABLE", "identity_clients"),
            grants_table: var("GRANTSTORE_GRANTS_TABLE", "identity_persisted_grants"),
            grant_key_index: var("GRANTSTORE_GRANT_KEY_INDEX", DEFAULT_GRANT_KEY_INDEX),
            bulk_delete,
            page_size,
            endpoint_url: lookup("AWS_ENDPOINT_URL").filter(|v| !v.is_empty()),
            region: var("AWS_REGION", "us-east-1"),
        })
    }

    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

fn parse_page_size(value: &str) -> Option<i32> {
    value.trim().parse().ok().filter(|size: &i32| *size > 0)
}

/// Creates a DynamoDB client with the given configuration.
///
/// Credentials come from the SDK's default provider chain.
pub async fn create_client(config: &StoreConfig) -> Client {
    let mut sdk_config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        sdk_config_loader = sdk_config_loader.endpoint_url(endpoint);
    }

    let sdk_config = sdk_config_loader.load().await;
    Client::new(&sdk_config)
}
