use crate::storage::{RepositoryError, Result};

use super::types::Client;

/// Validates a client before it is written.
pub fn validate_client(client: &Client) -> Result<()> {
    if client.client_id.trim().is_empty() {
        return Err(RepositoryError::InvalidArgument(
            "client id is required".to_string(),
        ));
    }
    Ok(())
}
