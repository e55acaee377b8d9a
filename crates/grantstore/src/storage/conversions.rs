//! Attribute conversion functions.
//!
//! Pure functions for converting between store items and domain types.
//! These are testable in isolation without DynamoDB access.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use grantstore_core::client::Client;
use grantstore_core::grant::{GrantType, PersistedGrant};
use grantstore_core::storage::RepositoryError;

use super::keys;
use super::table::Item;

// ============================================================================
// Client conversions
// ============================================================================

/// Convert a Client to a store item.
///
/// The whole definition is kept as one JSON document under `data`; only the
/// identifier is a real attribute.
pub fn client_to_item(client: &Client, updated_at: DateTime<Utc>) -> Result<Item, RepositoryError> {
    let data = serde_json::to_string(client)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    let mut item = Item::new();
    item.insert(
        keys::CLIENT_ID.to_string(),
        AttributeValue::S(client.client_id.clone()),
    );
    item.insert(keys::CLIENT_DATA.to_string(), AttributeValue::S(data));
    item.insert(
        keys::CLIENT_UPDATED_AT.to_string(),
        AttributeValue::S(updated_at.to_rfc3339()),
    );

    Ok(item)
}

/// Convert a store item to Client.
pub fn item_to_client(item: &Item) -> Result<Client, RepositoryError> {
    let client_id = get_string(item, keys::CLIENT_ID)?;
    let data = get_string(item, keys::CLIENT_DATA)?;
    let client: Client =
        serde_json::from_str(&data).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    if client.client_id != client_id {
        return Err(RepositoryError::InvalidData(format!(
            "Client payload id {} does not match key {}",
            client.client_id, client_id
        )));
    }

    Ok(client)
}

// ============================================================================
// Grant conversions
// ============================================================================

/// Convert a PersistedGrant to a store item.
pub fn grant_to_item(grant: &PersistedGrant) -> Item {
    let mut item = Item::new();

    // Keys
    item.insert(
        keys::GRANT_SUBJECT_ID.to_string(),
        AttributeValue::S(keys::grant_partition(grant.subject_id.as_deref())),
    );
    item.insert(
        keys::GRANT_KEY.to_string(),
        AttributeValue::S(grant.key.clone()),
    );

    // Data
    item.insert(
        keys::GRANT_CLIENT_ID.to_string(),
        AttributeValue::S(grant.client_id.clone()),
    );
    item.insert(
        keys::GRANT_TYPE.to_string(),
        AttributeValue::S(grant.grant_type.as_str().to_string()),
    );
    item.insert(
        keys::GRANT_CREATION_TIME.to_string(),
        AttributeValue::S(grant.creation_time.to_rfc3339()),
    );
    if let Some(expiration) = grant.expiration {
        item.insert(
            keys::GRANT_EXPIRATION.to_string(),
            AttributeValue::S(expiration.to_rfc3339()),
        );
        item.insert(
            keys::GRANT_TTL.to_string(),
            AttributeValue::N(expiration.timestamp().to_string()),
        );
    }
    item.insert(
        keys::GRANT_DATA.to_string(),
        AttributeValue::S(grant.data.clone()),
    );

    item
}

/// Convert a store item to PersistedGrant.
pub fn item_to_grant(item: &Item) -> Result<PersistedGrant, RepositoryError> {
    let partition = get_string(item, keys::GRANT_SUBJECT_ID)?;

    Ok(PersistedGrant {
        key: get_string(item, keys::GRANT_KEY)?,
        grant_type: GrantType::from(get_string(item, keys::GRANT_TYPE)?),
        subject_id: keys::subject_from_partition(&partition),
        client_id: get_string(item, keys::GRANT_CLIENT_ID)?,
        creation_time: get_datetime(item, keys::GRANT_CREATION_TIME)?,
        expiration: get_optional_datetime(item, keys::GRANT_EXPIRATION)?,
        data: get_string(item, keys::GRANT_DATA)?,
    })
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get a required string attribute.
fn get_string(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional string attribute.
fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

/// Parse an RFC 3339 timestamp.
fn parse_datetime(key: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidData(format!("Invalid datetime {}: {}", key, e)))
}

/// Get a required datetime attribute (RFC 3339 format).
fn get_datetime(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    parse_datetime(key, &get_string(item, key)?)
}

/// Get an optional datetime attribute. Absent means `None`; present but
/// malformed is an error.
fn get_optional_datetime(item: &Item, key: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    get_optional_string(item, key)
        .map(|s| parse_datetime(key, &s))
        .transpose()
}
