use crate::storage::{RepositoryError, Result};

use super::types::PersistedGrant;

/// Validates a grant before it is written.
pub fn validate_grant(grant: &PersistedGrant) -> Result<()> {
    if grant.key.trim().is_empty() {
        return Err(RepositoryError::InvalidArgument(
            "grant key is required".to_string(),
        ));
    }
    if grant.client_id.trim().is_empty() {
        return Err(RepositoryError::InvalidArgument(format!(
            "client id is required for grant {}",
            grant.key
        )));
    }
    if grant
        .subject_id
        .as_deref()
        .is_some_and(|subject| subject.trim().is_empty())
    {
        return Err(RepositoryError::InvalidArgument(format!(
            "subject id must not be blank for grant {}",
            grant.key
        )));
    }
    Ok(())
}
