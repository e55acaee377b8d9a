//! Table layout: attribute names, key schemas and partition values.
//!
//! Pure functions only. Attribute names are camelCase as they appear in the
//! store; several of them (`key`, `type`, `data`) are DynamoDB reserved words
//! and must always go through expression placeholders.

use super::table::KeySchema;

// ============================================================================
// Client table
// ============================================================================

pub const CLIENT_ID: &str = "clientId";
pub const CLIENT_DATA: &str = "data";
pub const CLIENT_UPDATED_AT: &str = "updatedAt";

/// Key schema of the client table: one item per client identifier.
pub fn client_table_schema() -> KeySchema {
    KeySchema::partition(CLIENT_ID)
}

// ============================================================================
// Grant table
// ============================================================================

pub const GRANT_SUBJECT_ID: &str = "subjectId";
pub const GRANT_KEY: &str = "key";
pub const GRANT_CLIENT_ID: &str = "clientId";
pub const GRANT_TYPE: &str = "type";
pub const GRANT_CREATION_TIME: &str = "creationTime";
pub const GRANT_EXPIRATION: &str = "expiration";
pub const GRANT_DATA: &str = "data";
pub const GRANT_TTL: &str = "ttl";

/// Default name of the key-only lookup index.
pub const DEFAULT_GRANT_KEY_INDEX: &str = "KeyIndex";

/// Partition holding grants that were stored without a subject.
///
/// The leading `~` keeps it out of the way of real subject identifiers; it is
/// never handed back as a subject id.
pub const NO_SUBJECT_PARTITION: &str = "~nosubject";

/// Key schema of the grant table.
///
/// Partition `subjectId`, sort `key`, plus a global secondary index on `key`
/// alone so a grant can be resolved without knowing its subject. The index
/// must exist before the repository is used.
pub fn grant_table_schema(key_index: &str) -> KeySchema {
    KeySchema::composite(GRANT_SUBJECT_ID, GRANT_KEY).with_index(key_index, GRANT_KEY)
}

/// Partition value for a grant's subject.
pub fn grant_partition(subject_id: Option<&str>) -> String {
    subject_id.unwrap_or(NO_SUBJECT_PARTITION).to_string()
}

/// Maps a stored partition value back to a subject id.
pub fn subject_from_partition(partition: &str) -> Option<String> {
    if partition == NO_SUBJECT_PARTITION {
        None
    } else {
        Some(partition.to_string())
    }
}

/// Returns true if a subject id can address a real partition.
pub fn is_addressable_subject(subject_id: &str) -> bool {
    !subject_id.trim().is_empty() && subject_id != NO_SUBJECT_PARTITION
}
