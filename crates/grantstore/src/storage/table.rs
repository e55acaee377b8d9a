//! The document-table seam the repositories are written against.
//!
//! A table exposes exactly the four operations a partition/sort-key store is
//! good at: key-based query, filtered scan, unconditional put and delete by
//! full key. Items are DynamoDB attribute maps regardless of backend.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use grantstore_core::storage::{RepositoryError, Result};

/// A store-native item.
pub type Item = HashMap<String, AttributeValue>;

/// Key layout of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: Option<String>,
    pub indexes: Vec<IndexSchema>,
}

/// A global secondary index the table is expected to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub partition_key: String,
}

impl KeySchema {
    /// A table keyed by partition only.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            indexes: Vec::new(),
        }
    }

    /// A table keyed by partition and sort key.
    pub fn composite(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
            indexes: Vec::new(),
        }
    }

    /// Declares a global secondary index.
    pub fn with_index(mut self, name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        self.indexes.push(IndexSchema {
            name: name.into(),
            partition_key: partition_key.into(),
        });
        self
    }

    /// Looks up a declared index by name.
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// Partition attribute a query targets: the table's own, or the index's.
    pub fn query_partition_key(&self, index_name: Option<&str>) -> Result<&str> {
        match index_name {
            None => Ok(&self.partition_key),
            Some(name) => self
                .index(name)
                .map(|index| index.partition_key.as_str())
                .ok_or_else(|| {
                    RepositoryError::InvalidArgument(format!("Unknown index: {}", name))
                }),
        }
    }

    /// Extracts the full primary key (partition and sort) of an item.
    pub fn key_of(&self, item: &Item) -> Result<Item> {
        let mut key = Item::new();
        for attribute in std::iter::once(&self.partition_key).chain(self.sort_key.as_ref()) {
            let value = item.get(attribute).ok_or_else(|| {
                RepositoryError::InvalidData(format!("Missing key attribute: {}", attribute))
            })?;
            key.insert(attribute.clone(), value.clone());
        }
        Ok(key)
    }
}

/// Equality predicates on string attributes, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    conditions: Vec<(String, String)>,
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `attribute = value`.
    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((attribute.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    /// Returns true if every condition holds for the item.
    pub fn matches(&self, item: &Item) -> bool {
        self.conditions.iter().all(|(attribute, expected)| {
            item.get(attribute)
                .and_then(|value| value.as_s().ok())
                .is_some_and(|actual| actual == expected)
        })
    }
}

/// Equality query on the partition attribute of the table or of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyQuery {
    /// `None` queries the table itself.
    pub index_name: Option<String>,
    pub partition_value: String,
    pub filter: AttributeFilter,
}

impl KeyQuery {
    /// Queries one partition of the table.
    pub fn partition(value: impl Into<String>) -> Self {
        Self {
            index_name: None,
            partition_value: value.into(),
            filter: AttributeFilter::new(),
        }
    }

    /// Queries one partition of a secondary index.
    pub fn index(index_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index_name: Some(index_name.into()),
            partition_value: value.into(),
            filter: AttributeFilter::new(),
        }
    }

    /// Applies a post-key filter.
    pub fn with_filter(mut self, filter: AttributeFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// One page of a query or scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    /// Where the next page starts; `None` once the result is exhausted.
    pub last_evaluated_key: Option<Item>,
}

impl Page {
    pub fn has_more(&self) -> bool {
        self.last_evaluated_key.is_some()
    }
}

/// A single logical table in a partition/sort-key document store.
///
/// Implementations perform no retries; that belongs to the store client.
#[async_trait]
pub trait DocumentTable: Send + Sync {
    /// Key layout of the table.
    fn schema(&self) -> &KeySchema;

    /// Reads one page of a key-based query.
    async fn query(&self, query: &KeyQuery, exclusive_start: Option<Item>) -> Result<Page>;

    /// Reads one page of a full-table scan. A page may be empty and still
    /// have more pages after it.
    async fn scan(&self, filter: &AttributeFilter, exclusive_start: Option<Item>) -> Result<Page>;

    /// Creates or replaces an item.
    async fn put(&self, item: Item) -> Result<()>;

    /// Deletes an item by full key. Returns whether an item was removed.
    async fn delete(&self, key: Item) -> Result<bool>;
}
