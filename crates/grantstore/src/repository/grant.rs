//! Persisted grants, partitioned by subject and sorted by grant key.

use async_trait::async_trait;
use futures_util::future::join_all;

use grantstore_core::grant::{validate_grant, GrantFilter, GrantType, PersistedGrant};
use grantstore_core::storage::{PersistedGrantStore, RepositoryError, Result};

use super::{first_item, query_all};
use crate::config::BulkDeleteStrategy;
use crate::storage::conversions::{grant_to_item, item_to_grant};
use crate::storage::keys;
use crate::storage::{AttributeFilter, DocumentTable, Item, KeyQuery, Page};

/// [`PersistedGrantStore`] backed by a document table keyed by
/// (`subjectId`, `key`).
///
/// Lookups by grant key alone go through the key-only index named at
/// construction. That index is a deployment precondition; see
/// [`DynamoDbTable::verify_schema`](crate::storage::dynamodb::DynamoDbTable::verify_schema).
#[derive(Debug, Clone)]
pub struct GrantRepository<T> {
    table: T,
    key_index: String,
    strategy: BulkDeleteStrategy,
}

impl<T: DocumentTable> GrantRepository<T> {
    /// Creates a repository using the default full-scan bulk delete.
    pub fn new(table: T, key_index: impl Into<String>) -> Self {
        Self {
            table,
            key_index: key_index.into(),
            strategy: BulkDeleteStrategy::default(),
        }
    }

    /// Sets how `remove_all` finds the grants it deletes.
    pub fn with_strategy(mut self, strategy: BulkDeleteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> BulkDeleteStrategy {
        self.strategy
    }

    /// The underlying table.
    pub fn table(&self) -> &T {
        &self.table
    }

    fn key_query(&self, key: &str) -> KeyQuery {
        KeyQuery::index(&self.key_index, key)
    }

    /// Reads the next page of bulk-delete candidates.
    ///
    /// `Scan` reads the whole table, so its cost grows with the table rather
    /// than with the number of matches. `PartitionQuery` stays inside the
    /// subject's partition.
    async fn candidates(&self, filter: &GrantFilter, exclusive_start: Option<Item>) -> Result<Page> {
        match self.strategy {
            BulkDeleteStrategy::Scan => {
                let predicate = narrow(
                    AttributeFilter::new().eq(keys::GRANT_SUBJECT_ID, filter.subject_id()),
                    filter,
                );
                self.table.scan(&predicate, exclusive_start).await
            }
            BulkDeleteStrategy::PartitionQuery => {
                let query = KeyQuery::partition(filter.subject_id())
                    .with_filter(narrow(AttributeFilter::new(), filter));
                self.table.query(&query, exclusive_start).await
            }
        }
    }

    /// Deletes every grant matching the filter, one page at a time.
    ///
    /// All deletes of a page are awaited before the next page is read. A
    /// fault stops the loop; deletions already done stay done and are
    /// reported through [`RepositoryError::PartialDeletion`].
    async fn delete_matching(&self, filter: &GrantFilter) -> Result<usize> {
        let schema = self.table.schema();
        let mut deleted = 0;
        let mut exclusive_start = None;

        loop {
            let page = self
                .candidates(filter, exclusive_start)
                .await
                .map_err(|e| aborted(deleted, e))?;

            let keys = page
                .items
                .iter()
                .map(|item| schema.key_of(item))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| aborted(deleted, e))?;

            let mut failure = None;
            for result in join_all(keys.into_iter().map(|key| self.table.delete(key))).await {
                match result {
                    Ok(true) => deleted += 1,
                    Ok(false) => tracing::debug!(%filter, "Grant already gone before delete"),
                    Err(e) => {
                        failure.get_or_insert(e);
                    }
                }
            }
            if let Some(e) = failure {
                return Err(aborted(deleted, e));
            }

            match page.last_evaluated_key {
                Some(key) => exclusive_start = Some(key),
                None => return Ok(deleted),
            }
        }
    }

    /// Read-then-delete: the full key is only known after the index lookup.
    async fn remove_by_key(&self, key: &str) -> Result<()> {
        let Some(item) = first_item(&self.table, &self.key_query(key)).await? else {
            tracing::debug!(%key, "No grant to remove");
            return Ok(());
        };

        let full_key = self.table.schema().key_of(&item)?;
        if !self.table.delete(full_key).await? {
            tracing::debug!(%key, "Grant removed concurrently");
        }
        Ok(())
    }

    async fn revoke(&self, filter: GrantFilter) -> Result<usize> {
        if !keys::is_addressable_subject(filter.subject_id()) {
            tracing::debug!(%filter, "Subject cannot own grants, nothing to remove");
            return Ok(0);
        }

        let deleted = self.delete_matching(&filter).await.inspect_err(|e| {
            tracing::error!(
                %filter,
                deleted = e.deleted_before_failure().unwrap_or(0),
                error = %e,
                "Failed to remove grants"
            )
        })?;
        tracing::info!(%filter, deleted, "Removed grants");
        Ok(deleted)
    }
}

/// Adds the client and, when set, the grant type conditions of a filter.
fn narrow(predicate: AttributeFilter, filter: &GrantFilter) -> AttributeFilter {
    let predicate = predicate.eq(keys::GRANT_CLIENT_ID, filter.client_id());
    match filter.grant_type() {
        Some(grant_type) => predicate.eq(keys::GRANT_TYPE, grant_type.as_str()),
        None => predicate,
    }
}

/// Wraps a bulk-delete fault with the progress made before it.
fn aborted(deleted: usize, error: RepositoryError) -> RepositoryError {
    if deleted == 0 {
        error
    } else {
        RepositoryError::PartialDeletion {
            deleted,
            source: Box::new(error),
        }
    }
}

#[async_trait]
impl<T: DocumentTable> PersistedGrantStore for GrantRepository<T> {
    async fn get_all(&self, subject_id: &str) -> Result<Vec<PersistedGrant>> {
        if !keys::is_addressable_subject(subject_id) {
            tracing::debug!(%subject_id, "Subject cannot own grants, skipping lookup");
            return Ok(Vec::new());
        }

        let items = query_all(&self.table, &KeyQuery::partition(subject_id))
            .await
            .inspect_err(|e| tracing::error!(%subject_id, error = %e, "Failed to list grants"))?;

        items
            .iter()
            .map(item_to_grant)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| tracing::error!(%subject_id, error = %e, "Failed to read grants"))
    }

    async fn get(&self, key: &str) -> Result<Option<PersistedGrant>> {
        if key.is_empty() {
            tracing::debug!("Empty grant key, skipping lookup");
            return Ok(None);
        }

        let item = first_item(&self.table, &self.key_query(key))
            .await
            .inspect_err(|e| tracing::error!(%key, error = %e, "Failed to get grant"))?;

        item.map(|item| item_to_grant(&item))
            .transpose()
            .inspect_err(|e| tracing::error!(%key, error = %e, "Failed to read grant"))
    }

    async fn store(&self, grant: &PersistedGrant) -> Result<()> {
        validate_grant(grant)?;
        if let Some(subject_id) = grant.subject_id.as_deref() {
            if !keys::is_addressable_subject(subject_id) {
                return Err(RepositoryError::InvalidArgument(format!(
                    "subject id {} is reserved for grant {}",
                    subject_id, grant.key
                )));
            }
        }

        self.table.put(grant_to_item(grant)).await.inspect_err(|e| {
            tracing::error!(
                key = %grant.key,
                subject_id = grant.subject_id.as_deref().unwrap_or_default(),
                client_id = %grant.client_id,
                error = %e,
                "Failed to store grant"
            )
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "grant key is required".to_string(),
            ));
        }

        self.remove_by_key(key)
            .await
            .inspect_err(|e| tracing::error!(%key, error = %e, "Failed to remove grant"))
    }

    async fn remove_all(&self, subject_id: &str, client_id: &str) -> Result<usize> {
        self.revoke(GrantFilter::new(subject_id, client_id)?).await
    }

    async fn remove_all_of_type(
        &self,
        subject_id: &str,
        client_id: &str,
        grant_type: &GrantType,
    ) -> Result<usize> {
        self.revoke(GrantFilter::new(subject_id, client_id)?.with_type(grant_type)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    use crate::repository::test_support::CapturedLogs;
    use crate::storage::inmemory::{InMemoryTable, TableOperation};

    fn table(page_size: usize) -> InMemoryTable {
        InMemoryTable::new(keys::grant_table_schema(keys::DEFAULT_GRANT_KEY_INDEX))
            .with_page_size(page_size)
    }

    fn repository(table: &InMemoryTable) -> GrantRepository<InMemoryTable> {
        GrantRepository::new(table.clone(), keys::DEFAULT_GRANT_KEY_INDEX)
    }

    fn timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn grant(key: &str, subject: &str, client: &str, grant_type: GrantType) -> PersistedGrant {
        PersistedGrant::new(key, grant_type, subject, client, r#"{"scopes":["openid"]}"#)
            .with_creation_time(timestamp("2024-01-15T10:30:00Z"))
    }

    /// Subject u1 with grants a and b for c1 and c for c2.
    async fn seed_u1(repository: &GrantRepository<InMemoryTable>) {
        for g in [
            grant("a", "u1", "c1", GrantType::RefreshToken),
            grant("b", "u1", "c1", GrantType::AuthorizationCode),
            grant("c", "u1", "c2", GrantType::RefreshToken),
        ] {
            repository.store(&g).await.unwrap();
        }
    }

    fn keys_of(grants: &[PersistedGrant]) -> Vec<&str> {
        let mut keys: Vec<&str> = grants.iter().map(|g| g.key.as_str()).collect();
        keys.sort();
        keys
    }

    // ------------------------------------------------------------------------
    // get / get_all / store
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_store_then_get() {
        let table = table(100);
        let repository = repository(&table);
        let g = grant("k1", "alice", "web", GrantType::RefreshToken)
            .with_expiration(timestamp("2024-02-14T10:30:00Z"));

        repository.store(&g).await.unwrap();

        assert_eq!(repository.get("k1").await.unwrap(), Some(g.clone()));
        assert_eq!(repository.get_all("alice").await.unwrap(), vec![g]);
    }

    #[tokio::test]
    async fn test_get_unknown_key() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        assert_eq!(repository.get("zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_resolves_across_pages() {
        let table = table(1);
        let repository = repository(&table);
        seed_u1(&repository).await;
        repository
            .store(&grant("z", "u9", "c1", GrantType::UserConsent))
            .await
            .unwrap();

        let found = repository.get("z").await.unwrap().unwrap();
        assert_eq!(found.subject_id.as_deref(), Some("u9"));
    }

    #[tokio::test]
    async fn test_empty_inputs_skip_store() {
        let table = table(100);
        let repository = repository(&table);

        assert_eq!(repository.get("").await.unwrap(), None);
        assert!(repository.get_all("").await.unwrap().is_empty());
        assert!(repository
            .get_all(keys::NO_SUBJECT_PARTITION)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(table.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_all_spans_pages_and_clients() {
        let table = table(2);
        let repository = repository(&table);
        seed_u1(&repository).await;
        repository
            .store(&grant("d", "u2", "c1", GrantType::RefreshToken))
            .await
            .unwrap();

        let grants = repository.get_all("u1").await.unwrap();
        assert_eq!(keys_of(&grants), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_store_is_upsert() {
        let table = table(100);
        let repository = repository(&table);
        let original = grant("k1", "alice", "web", GrantType::RefreshToken);
        repository.store(&original).await.unwrap();

        let mut renewed = original.clone();
        renewed.data = r#"{"renewed":true}"#.to_string();
        repository.store(&renewed).await.unwrap();

        assert_eq!(repository.get("k1").await.unwrap(), Some(renewed));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_subjectless_grant() {
        let table = table(100);
        let repository = repository(&table);
        let g = grant("dev-1", "unused", "tv", GrantType::DeviceCode).without_subject();

        repository.store(&g).await.unwrap();

        assert_eq!(repository.get("dev-1").await.unwrap(), Some(g));
        assert!(repository
            .get_all(keys::NO_SUBJECT_PARTITION)
            .await
            .unwrap()
            .is_empty());

        repository.remove("dev-1").await.unwrap();
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_rejects_reserved_subject_before_io() {
        let table = table(100);
        let repository = repository(&table);
        let g = grant("k1", keys::NO_SUBJECT_PARTITION, "c1", GrantType::RefreshToken);

        let err = repository.store(&g).await.unwrap_err();

        assert!(err.is_invalid_argument());
        assert_eq!(table.total_calls(), 0);
        assert!(table.is_empty().await);
        assert_eq!(repository.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_rejects_invalid_grant_before_io() {
        let table = table(100);
        let repository = repository(&table);

        let no_key = grant("", "alice", "web", GrantType::RefreshToken);
        let no_client = grant("k1", "alice", "", GrantType::RefreshToken);

        assert!(repository.store(&no_key).await.unwrap_err().is_invalid_argument());
        assert!(repository
            .store(&no_client)
            .await
            .unwrap_err()
            .is_invalid_argument());
        assert_eq!(table.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_all_fault_is_logged() {
        let table = table(100);
        let repository = repository(&table);
        let fault = RepositoryError::ConnectionFailed("broken pipe".to_string());
        table.fail_next(TableOperation::Query, fault.clone()).await;

        let (logs, _guard) = CapturedLogs::install();
        assert_eq!(repository.get_all("u1").await.unwrap_err(), fault);

        let output = logs.contents();
        assert!(output.contains("Failed to list grants"));
        assert!(output.contains("subject_id=u1"));
    }

    // ------------------------------------------------------------------------
    // remove
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_remove_existing() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        repository.remove("b").await.unwrap();

        assert_eq!(repository.get("b").await.unwrap(), None);
        assert_eq!(keys_of(&repository.get_all("u1").await.unwrap()), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        repository.remove("nope").await.unwrap();

        assert_eq!(table.calls(TableOperation::Delete), 0);
        assert_eq!(table.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove_empty_key_is_invalid() {
        let table = table(100);
        let repository = repository(&table);

        assert!(repository.remove("").await.unwrap_err().is_invalid_argument());
        assert_eq!(table.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_remove_delete_fault_is_logged() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;
        let fault = RepositoryError::QueryFailed("Transaction conflict, please retry".to_string());
        table.fail_next(TableOperation::Delete, fault.clone()).await;

        let (logs, _guard) = CapturedLogs::install();
        assert_eq!(repository.remove("a").await.unwrap_err(), fault);

        let output = logs.contents();
        assert!(output.contains("Failed to remove grant"));
        assert!(output.contains("key=a"));
        assert_eq!(table.len().await, 3);
    }

    // ------------------------------------------------------------------------
    // remove_all
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_remove_all_by_subject_and_client() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        assert_eq!(repository.remove_all("u1", "c1").await.unwrap(), 2);

        let remaining = repository.get_all("u1").await.unwrap();
        assert_eq!(keys_of(&remaining), vec!["c"]);
    }

    #[tokio::test]
    async fn test_remove_all_of_type_narrows() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        let deleted = repository
            .remove_all_of_type("u1", "c1", &GrantType::RefreshToken)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(
            keys_of(&repository.get_all("u1").await.unwrap()),
            vec!["b", "c"]
        );
    }

    #[tokio::test]
    async fn test_remove_all_leaves_other_subjects() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;
        repository
            .store(&grant("d", "u2", "c1", GrantType::RefreshToken))
            .await
            .unwrap();

        repository.remove_all("u1", "c1").await.unwrap();

        assert!(repository.get("d").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_all_nothing_matches() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        assert_eq!(repository.remove_all("u1", "c9").await.unwrap(), 0);
        assert_eq!(table.calls(TableOperation::Delete), 0);
    }

    #[tokio::test]
    async fn test_remove_all_rejects_empty_arguments() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;
        let before = table.total_calls();

        assert!(repository
            .remove_all("", "c1")
            .await
            .unwrap_err()
            .is_invalid_argument());
        assert!(repository
            .remove_all("u1", "")
            .await
            .unwrap_err()
            .is_invalid_argument());
        assert!(repository
            .remove_all_of_type("u1", "c1", &GrantType::from(""))
            .await
            .unwrap_err()
            .is_invalid_argument());

        assert_eq!(table.total_calls(), before);
        assert_eq!(table.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove_all_never_reaches_subjectless_grants() {
        let table = table(100);
        let repository = repository(&table);
        let g = grant("dev-1", "unused", "tv", GrantType::DeviceCode).without_subject();
        repository.store(&g).await.unwrap();

        let deleted = repository
            .remove_all(keys::NO_SUBJECT_PARTITION, "tv")
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_all_walks_every_scan_page() {
        let table = table(1);
        let repository = repository(&table);
        for i in 0..6 {
            let client = if i % 2 == 0 { "c1" } else { "c2" };
            repository
                .store(&grant(&format!("k{i}"), "u1", client, GrantType::RefreshToken))
                .await
                .unwrap();
        }

        assert_eq!(repository.remove_all("u1", "c1").await.unwrap(), 3);
        assert_eq!(table.len().await, 3);
        assert_eq!(table.calls(TableOperation::Scan), 6);
    }

    #[tokio::test]
    async fn test_remove_all_with_partition_query() {
        let table = table(2);
        let repository = repository(&table).with_strategy(BulkDeleteStrategy::PartitionQuery);
        seed_u1(&repository).await;
        repository
            .store(&grant("d", "u2", "c1", GrantType::RefreshToken))
            .await
            .unwrap();

        assert_eq!(repository.remove_all("u1", "c1").await.unwrap(), 2);
        assert_eq!(table.calls(TableOperation::Scan), 0);
        assert_eq!(keys_of(&repository.get_all("u1").await.unwrap()), vec!["c"]);
        assert!(repository.get("d").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_all_partial_failure_reports_progress() {
        let table = table(1);
        let repository = repository(&table);
        for key in ["k1", "k2", "k3"] {
            repository
                .store(&grant(key, "u1", "c1", GrantType::RefreshToken))
                .await
                .unwrap();
        }
        let fault = RepositoryError::ConnectionFailed("connection reset".to_string());
        table.fail_after(TableOperation::Delete, 2, fault.clone()).await;

        let (logs, _guard) = CapturedLogs::install();
        let err = repository.remove_all("u1", "c1").await.unwrap_err();

        assert_eq!(
            err,
            RepositoryError::PartialDeletion {
                deleted: 2,
                source: Box::new(fault),
            }
        );
        assert_eq!(table.len().await, 1);

        let output = logs.contents();
        assert!(output.contains("Failed to remove grants"));
        assert!(output.contains("subject=u1 client=c1"));
        assert!(output.contains("deleted=2"));
    }

    #[tokio::test]
    async fn test_remove_all_failure_before_any_delete() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;
        let fault = RepositoryError::QueryFailed("Table not found".to_string());
        table.fail_next(TableOperation::Scan, fault.clone()).await;

        let err = repository.remove_all("u1", "c1").await.unwrap_err();

        assert_eq!(err, fault);
        assert_eq!(err.deleted_before_failure(), None);
        assert_eq!(table.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove_all_awaits_whole_page() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;
        repository
            .store(&grant("d", "u1", "c1", GrantType::UserConsent))
            .await
            .unwrap();
        let fault = RepositoryError::QueryFailed("throttled".to_string());
        table.fail_after(TableOperation::Delete, 1, fault.clone()).await;

        let err = repository.remove_all("u1", "c1").await.unwrap_err();

        // One delete of the three failed; the other two still completed.
        assert_eq!(err.deleted_before_failure(), Some(2));
        assert_eq!(table.calls(TableOperation::Delete), 3);
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_scenario_revoke_client() {
        let table = table(100);
        let repository = repository(&table);
        seed_u1(&repository).await;

        repository.remove_all("u1", "c1").await.unwrap();

        let remaining = repository.get_all("u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0], grant("c", "u1", "c2", GrantType::RefreshToken));
    }
}
