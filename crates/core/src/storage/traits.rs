use async_trait::async_trait;

use crate::client::Client;
use crate::grant::{GrantType, PersistedGrant};

use super::Result;

/// Storage contract for client registrations.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds a client by its identifier.
    ///
    /// An empty identifier yields `Ok(None)` without touching the store.
    async fn find_by_id(&self, client_id: &str) -> Result<Option<Client>>;

    /// Creates or replaces a client (last writer wins).
    async fn store(&self, client: &Client) -> Result<()>;
}

/// Storage contract for persisted grants.
#[async_trait]
pub trait PersistedGrantStore: Send + Sync {
    /// Gets every grant held by a subject, in store order.
    async fn get_all(&self, subject_id: &str) -> Result<Vec<PersistedGrant>>;

    /// Gets a grant by its unique key.
    async fn get(&self, key: &str) -> Result<Option<PersistedGrant>>;

    /// Creates or replaces a grant.
    async fn store(&self, grant: &PersistedGrant) -> Result<()>;

    /// Removes a grant by key. Removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Removes all grants of a client held by a subject.
    ///
    /// Returns the number of grants removed. Not atomic: on failure some
    /// unknown subset may already be gone.
    async fn remove_all(&self, subject_id: &str, client_id: &str) -> Result<usize>;

    /// Removes all grants of one type of a client held by a subject.
    async fn remove_all_of_type(
        &self,
        subject_id: &str,
        client_id: &str,
        grant_type: &GrantType,
    ) -> Result<usize>;
}
