//! In-memory document table.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;

use grantstore_core::storage::{RepositoryError, Result};

use crate::storage::table::{AttributeFilter, DocumentTable, Item, KeyQuery, KeySchema, Page};

/// Table operations, used to address counters and injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOperation {
    Query,
    Scan,
    Put,
    Delete,
}

type RowKey = (String, String);

#[derive(Debug, Default)]
struct Counters {
    query: AtomicUsize,
    scan: AtomicUsize,
    put: AtomicUsize,
    delete: AtomicUsize,
}

impl Counters {
    fn get(&self, operation: TableOperation) -> &AtomicUsize {
        match operation {
            TableOperation::Query => &self.query,
            TableOperation::Scan => &self.scan,
            TableOperation::Put => &self.put,
            TableOperation::Delete => &self.delete,
        }
    }
}

/// A fault armed for one operation: let `remaining` calls through, then fail.
#[derive(Debug, Clone)]
struct Fault {
    operation: TableOperation,
    remaining: usize,
    error: RepositoryError,
}

/// In-memory table for tests and local development.
///
/// Rows live in a `BTreeMap` wrapped in `Arc<RwLock<_>>`, ordered by
/// (partition, sort). Paging follows DynamoDB: the page size bounds the rows
/// *evaluated*, filters apply afterwards, so a page can come back empty while
/// more pages remain. Data is lost when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryTable {
    schema: KeySchema,
    rows: Arc<RwLock<BTreeMap<RowKey, Item>>>,
    page_size: usize,
    counters: Arc<Counters>,
    faults: Arc<RwLock<Vec<Fault>>>,
}

impl InMemoryTable {
    /// Creates a new empty table with the given key layout.
    pub fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: 100,
            counters: Arc::new(Counters::default()),
            faults: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Sets how many rows a single query/scan page evaluates.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// How many times an operation has been called.
    pub fn calls(&self, operation: TableOperation) -> usize {
        self.counters.get(operation).load(Ordering::SeqCst)
    }

    /// Total calls across all operations.
    pub fn total_calls(&self) -> usize {
        [
            TableOperation::Query,
            TableOperation::Scan,
            TableOperation::Put,
            TableOperation::Delete,
        ]
        .into_iter()
        .map(|operation| self.calls(operation))
        .sum()
    }

    /// Makes `operation` fail with `error` after `succeed_first` more calls.
    pub async fn fail_after(
        &self,
        operation: TableOperation,
        succeed_first: usize,
        error: RepositoryError,
    ) {
        self.faults.write().await.push(Fault {
            operation,
            remaining: succeed_first,
            error,
        });
    }

    /// Makes the next call of `operation` fail.
    pub async fn fail_next(&self, operation: TableOperation, error: RepositoryError) {
        self.fail_after(operation, 0, error).await;
    }

    /// Counts the call and fires an armed fault, if any.
    async fn enter(&self, operation: TableOperation) -> Result<()> {
        self.counters.get(operation).fetch_add(1, Ordering::SeqCst);

        let mut faults = self.faults.write().await;
        if let Some(position) = faults.iter().position(|f| f.operation == operation) {
            if faults[position].remaining == 0 {
                return Err(faults.remove(position).error);
            }
            faults[position].remaining -= 1;
        }
        Ok(())
    }

    fn row_key(&self, item: &Item) -> Result<RowKey> {
        let partition = string_attribute(item, &self.schema.partition_key)?;
        let sort = match &self.schema.sort_key {
            Some(sort_key) => string_attribute(item, sort_key)?,
            None => String::new(),
        };
        Ok((partition, sort))
    }

    /// Evaluates one page of rows in table order, starting after
    /// `exclusive_start` and staying inside `partition` when given, keeping
    /// the rows that pass `keep`.
    async fn read_page(
        &self,
        partition: Option<&str>,
        exclusive_start: Option<Item>,
        keep: impl Fn(&Item) -> bool,
    ) -> Result<Page> {
        let start = match (exclusive_start, partition) {
            (Some(key), _) => Bound::Excluded(self.row_key(&key)?),
            (None, Some(partition)) => Bound::Included((partition.to_string(), String::new())),
            (None, None) => Bound::Unbounded,
        };
        let in_scope = |row_key: &RowKey| partition.is_none_or(|p| row_key.0 == p);

        let rows = self.rows.read().await;
        let mut evaluated = rows
            .range((start, Bound::Unbounded))
            .take_while(|&(row_key, _)| in_scope(row_key));
        let mut items = Vec::new();
        let mut last_item = None;

        for (_, item) in evaluated.by_ref().take(self.page_size) {
            if keep(item) {
                items.push(item.clone());
            }
            last_item = Some(item);
        }

        let last_evaluated_key = match last_item {
            Some(item) if evaluated.next().is_some() => Some(self.schema.key_of(item)?),
            _ => None,
        };

        Ok(Page {
            items,
            last_evaluated_key,
        })
    }
}

fn string_attribute(item: &Item, attribute: &str) -> Result<String> {
    match item.get(attribute) {
        Some(AttributeValue::S(value)) if !value.is_empty() => Ok(value.clone()),
        _ => Err(RepositoryError::InvalidData(format!(
            "Missing key attribute: {}",
            attribute
        ))),
    }
}

#[async_trait]
impl DocumentTable for InMemoryTable {
    fn schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn query(&self, query: &KeyQuery, exclusive_start: Option<Item>) -> Result<Page> {
        self.enter(TableOperation::Query).await?;
        let partition_key = self
            .schema
            .query_partition_key(query.index_name.as_deref())?
            .to_string();
        let key_filter = AttributeFilter::new().eq(partition_key, query.partition_value.clone());

        // Table partitions are contiguous rows; index partitions are not.
        let partition = match query.index_name {
            None => Some(query.partition_value.as_str()),
            Some(_) => None,
        };

        self.read_page(partition, exclusive_start, |item| {
            key_filter.matches(item) && query.filter.matches(item)
        })
        .await
    }

    async fn scan(&self, filter: &AttributeFilter, exclusive_start: Option<Item>) -> Result<Page> {
        self.enter(TableOperation::Scan).await?;
        self.read_page(None, exclusive_start, |item| filter.matches(item))
            .await
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.enter(TableOperation::Put).await?;
        let row_key = self.row_key(&item)?;
        self.rows.write().await.insert(row_key, item);
        Ok(())
    }

    async fn delete(&self, key: Item) -> Result<bool> {
        self.enter(TableOperation::Delete).await?;
        let row_key = self.row_key(&key)?;
        Ok(self.rows.write().await.remove(&row_key).is_some())
    }
}
