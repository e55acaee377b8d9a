use crate::storage::{RepositoryError, Result};

use super::types::{GrantType, PersistedGrant};

/// Predicate selecting the grants a bulk revocation removes.
///
/// Subject and client are always required; the grant type narrows the match
/// further when present. A filter can only be built from non-empty values, so
/// an accepted filter never matches "everything".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantFilter {
    subject_id: String,
    client_id: String,
    grant_type: Option<GrantType>,
}

impl GrantFilter {
    /// Matches every grant of `client_id` held by `subject_id`.
    pub fn new(subject_id: &str, client_id: &str) -> Result<Self> {
        if subject_id.trim().is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "subject id is required".to_string(),
            ));
        }
        if client_id.trim().is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "client id is required".to_string(),
            ));
        }
        Ok(Self {
            subject_id: subject_id.to_string(),
            client_id: client_id.to_string(),
            grant_type: None,
        })
    }

    /// Narrows the filter to one grant type.
    pub fn with_type(mut self, grant_type: &GrantType) -> Result<Self> {
        if grant_type.as_str().trim().is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "grant type is required".to_string(),
            ));
        }
        self.grant_type = Some(grant_type.clone());
        Ok(self)
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn grant_type(&self) -> Option<&GrantType> {
        self.grant_type.as_ref()
    }

    /// Returns true if the grant falls under this filter.
    pub fn matches(&self, grant: &PersistedGrant) -> bool {
        grant.subject_id.as_deref() == Some(self.subject_id.as_str())
            && grant.client_id == self.client_id
            && self
                .grant_type
                .as_ref()
                .is_none_or(|grant_type| &grant.grant_type == grant_type)
    }
}

impl std::fmt::Display for GrantFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subject={} client={}", self.subject_id, self.client_id)?;
        if let Some(grant_type) = &self.grant_type {
            write!(f, " type={grant_type}")?;
        }
        Ok(())
    }
}
