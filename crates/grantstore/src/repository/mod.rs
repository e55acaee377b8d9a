//! Repositories implementing the `grantstore_core::storage` contracts.
//!
//! Both repositories are generic over a [`DocumentTable`], so the same code
//! runs against DynamoDB in production and against
//! [`InMemoryTable`](crate::storage::inmemory::InMemoryTable) in tests.
//!
//! Store faults are logged through `tracing` with the parameters of the
//! failing call and returned unchanged. Nothing here retries.

mod client;
mod grant;

pub use client::ClientRepository;
pub use grant::GrantRepository;

use grantstore_core::storage::Result;

use crate::storage::{DocumentTable, Item, KeyQuery};

/// Follows a query across pages until the first item turns up.
///
/// Filtered pages can be empty while more pages remain, so the first page
/// alone is not enough.
async fn first_item<T: DocumentTable>(table: &T, query: &KeyQuery) -> Result<Option<Item>> {
    let mut exclusive_start = None;
    loop {
        let page = table.query(query, exclusive_start).await?;
        if let Some(item) = page.items.into_iter().next() {
            return Ok(Some(item));
        }
        match page.last_evaluated_key {
            Some(key) => exclusive_start = Some(key),
            None => return Ok(None),
        }
    }
}

/// Collects every item of a query.
async fn query_all<T: DocumentTable>(table: &T, query: &KeyQuery) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut exclusive_start = None;
    loop {
        let page = table.query(query, exclusive_start).await?;
        items.extend(page.items);
        match page.last_evaluated_key {
            Some(key) => exclusive_start = Some(key),
            None => return Ok(items),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;

    use crate::storage::inmemory::InMemoryTable;
    use crate::storage::{AttributeFilter, KeySchema};

    fn row(subject: &str, key: &str, client: &str) -> Item {
        [("subjectId", subject), ("key", key), ("clientId", client)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), AttributeValue::S(v.to_string())))
            .collect()
    }

    async fn table(page_size: usize) -> InMemoryTable {
        let table = InMemoryTable::new(KeySchema::composite("subjectId", "key"))
            .with_page_size(page_size);
        for (key, client) in [("a", "c1"), ("b", "c1"), ("c", "c2"), ("d", "c2")] {
            table.put(row("u1", key, client)).await.unwrap();
        }
        table
    }

    #[tokio::test]
    async fn test_first_item_skips_empty_pages() {
        let table = table(1).await;
        let query =
            KeyQuery::partition("u1").with_filter(AttributeFilter::new().eq("clientId", "c2"));

        let item = first_item(&table, &query).await.unwrap().unwrap();
        assert_eq!(item.get("key").unwrap().as_s().unwrap(), "c");
    }

    #[tokio::test]
    async fn test_first_item_none() {
        let table = table(1).await;
        let query = KeyQuery::partition("u2");
        assert!(first_item(&table, &query).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_all_collects_every_page() {
        let table = table(3).await;
        let items = query_all(&table, &KeyQuery::partition("u1")).await.unwrap();
        assert_eq!(items.len(), 4);
    }
}
