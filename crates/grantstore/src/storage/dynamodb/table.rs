//! DynamoDB implementation of [`DocumentTable`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeValue, GlobalSecondaryIndexDescription, IndexStatus, KeyType, ProjectionType,
    ReturnValue,
};
use aws_sdk_dynamodb::Client;
use grantstore_core::storage::{RepositoryError, Result};

use super::error::{
    map_delete_item_error, map_describe_table_error, map_put_item_error, map_query_error,
    map_scan_error,
};
use crate::storage::table::{
    AttributeFilter, DocumentTable, IndexSchema, Item, KeyQuery, KeySchema, Page,
};

/// Placeholder maps for one request.
///
/// Every attribute name goes through `#name` placeholders because `key`,
/// `type` and `data` are reserved words.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Expression {
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl Expression {
    /// Adds `#<tag> = :<tag>` and returns the condition text.
    pub fn equality(&mut self, tag: &str, attribute: &str, value: &str) -> String {
        self.names.insert(format!("#{tag}"), attribute.to_string());
        self.values
            .insert(format!(":{tag}"), AttributeValue::S(value.to_string()));
        format!("#{tag} = :{tag}")
    }

    /// Joins all filter conditions with `AND`. `None` for an empty filter.
    pub fn conjunction(&mut self, filter: &AttributeFilter) -> Option<String> {
        if filter.is_empty() {
            return None;
        }
        let clauses: Vec<String> = filter
            .conditions()
            .iter()
            .enumerate()
            .map(|(i, (attribute, value))| self.equality(&format!("f{i}"), attribute, value))
            .collect();
        Some(clauses.join(" AND "))
    }

    fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        if self.names.is_empty() {
            (None, None)
        } else {
            (Some(self.names), Some(self.values))
        }
    }
}

/// A single DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoDbTable {
    client: Client,
    table_name: String,
    schema: KeySchema,
    page_size: Option<i32>,
}

impl DynamoDbTable {
    /// Creates a table handle with the given client, name and key layout.
    pub fn new(client: Client, table_name: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            schema,
            page_size: None,
        }
    }

    /// Caps the number of items evaluated per query/scan page.
    pub fn with_page_size(mut self, page_size: Option<i32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Get the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Checks that the table exists and carries every declared index.
    ///
    /// Indexes are a deployment precondition; nothing here creates them.
    pub async fn verify_schema(&self) -> Result<()> {
        let response = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| map_describe_table_error(e, &self.table_name))?;

        let table = response.table().ok_or_else(|| {
            RepositoryError::QueryFailed(format!("Table {} not described", self.table_name))
        })?;

        for index in &self.schema.indexes {
            check_index(&self.table_name, table.global_secondary_indexes(), index)?;
        }

        Ok(())
    }
}

/// Checks a declared index against the table's description.
///
/// A live index must be hashed on the declared partition attribute. It must
/// also project all attributes, since grants read through it are converted
/// like table items.
fn check_index(
    table_name: &str,
    described: &[GlobalSecondaryIndexDescription],
    index: &IndexSchema,
) -> Result<()> {
    let Some(gsi) = described.iter().find(|gsi| {
        gsi.index_name() == Some(index.name.as_str())
            && !matches!(gsi.index_status(), Some(IndexStatus::Deleting))
    }) else {
        return Err(RepositoryError::MissingIndex {
            table: table_name.to_string(),
            index: index.name.clone(),
        });
    };

    let hashed_on_partition = gsi.key_schema().iter().any(|element| {
        element.key_type() == &KeyType::Hash && element.attribute_name() == index.partition_key
    });
    if !hashed_on_partition {
        return Err(RepositoryError::InvalidData(format!(
            "Index {} on table {} is not hashed on {}",
            index.name, table_name, index.partition_key
        )));
    }

    let projects_all = gsi
        .projection()
        .and_then(|projection| projection.projection_type())
        == Some(&ProjectionType::All);
    if !projects_all {
        return Err(RepositoryError::InvalidData(format!(
            "Index {} on table {} must project all attributes",
            index.name, table_name
        )));
    }

    Ok(())
}

fn page(items: Option<Vec<Item>>, last_evaluated_key: Option<Item>) -> Page {
    Page {
        items: items.unwrap_or_default(),
        last_evaluated_key: last_evaluated_key.filter(|key| !key.is_empty()),
    }
}

#[async_trait]
impl DocumentTable for DynamoDbTable {
    fn schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn query(&self, query: &KeyQuery, exclusive_start: Option<Item>) -> Result<Page> {
        let partition_key = self
            .schema
            .query_partition_key(query.index_name.as_deref())?;

        let mut expression = Expression::default();
        let key_condition = expression.equality("pk", partition_key, &query.partition_value);
        let filter = expression.conjunction(&query.filter);
        let (names, values) = expression.into_parts();

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(query.index_name.clone())
            .key_condition_expression(key_condition)
            .set_filter_expression(filter)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .set_exclusive_start_key(exclusive_start)
            .set_limit(self.page_size)
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(page(result.items, result.last_evaluated_key))
    }

    async fn scan(&self, filter: &AttributeFilter, exclusive_start: Option<Item>) -> Result<Page> {
        let mut expression = Expression::default();
        let filter = expression.conjunction(filter);
        let (names, values) = expression.into_parts();

        let result = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_filter_expression(filter)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .set_exclusive_start_key(exclusive_start)
            .set_limit(self.page_size)
            .send()
            .await
            .map_err(map_scan_error)?;

        Ok(page(result.items, result.last_evaluated_key))
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(map_put_item_error)?;

        Ok(())
    }

    async fn delete(&self, key: Item) -> Result<bool> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(map_delete_item_error)?;

        Ok(result
            .attributes
            .is_some_and(|attributes| !attributes.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::{KeySchemaElement, Projection};

    #[test]
    fn test_equality_uses_placeholders() {
        let mut expression = Expression::default();
        let condition = expression.equality("pk", "key", "abc");

        assert_eq!(condition, "#pk = :pk");
        assert_eq!(expression.names.get("#pk").unwrap(), "key");
        assert_eq!(
            expression.values.get(":pk").unwrap(),
            &AttributeValue::S("abc".to_string())
        );
    }

    #[test]
    fn test_conjunction() {
        let filter = AttributeFilter::new()
            .eq("subjectId", "u1")
            .eq("clientId", "c1")
            .eq("type", "refresh_token");
        let mut expression = Expression::default();

        let condition = expression.conjunction(&filter).unwrap();

        assert_eq!(condition, "#f0 = :f0 AND #f1 = :f1 AND #f2 = :f2");
        assert_eq!(expression.names.get("#f2").unwrap(), "type");
        assert_eq!(expression.values.len(), 3);
    }

    #[test]
    fn test_empty_filter_sets_nothing() {
        let mut expression = Expression::default();
        assert!(expression.conjunction(&AttributeFilter::new()).is_none());
        assert_eq!(expression.into_parts(), (None, None));
    }

    #[test]
    fn test_key_and_filter_share_maps() {
        let mut expression = Expression::default();
        expression.equality("pk", "subjectId", "u1");
        expression.conjunction(&AttributeFilter::new().eq("clientId", "c1"));

        let (names, values) = expression.into_parts();
        assert_eq!(names.unwrap().len(), 2);
        assert_eq!(values.unwrap().len(), 2);
    }

    fn key_index() -> IndexSchema {
        IndexSchema {
            name: "KeyIndex".to_string(),
            partition_key: "key".to_string(),
        }
    }

    fn described(
        hash_key: &str,
        projection: ProjectionType,
        status: IndexStatus,
    ) -> GlobalSecondaryIndexDescription {
        GlobalSecondaryIndexDescription::builder()
            .index_name("KeyIndex")
            .index_status(status)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(hash_key)
                    .key_type(KeyType::Hash)
                    .build()
                    .unwrap(),
            )
            .projection(Projection::builder().projection_type(projection).build())
            .build()
    }

    #[test]
    fn test_check_index_accepts_key_index() {
        let gsis = [described("key", ProjectionType::All, IndexStatus::Active)];
        assert!(check_index("grants", &gsis, &key_index()).is_ok());
    }

    #[test]
    fn test_check_index_missing_or_deleting() {
        let expected = RepositoryError::MissingIndex {
            table: "grants".to_string(),
            index: "KeyIndex".to_string(),
        };
        assert_eq!(check_index("grants", &[], &key_index()), Err(expected.clone()));

        let gsis = [described("key", ProjectionType::All, IndexStatus::Deleting)];
        assert_eq!(check_index("grants", &gsis, &key_index()), Err(expected));
    }

    #[test]
    fn test_check_index_wrong_hash_key() {
        let gsis = [described("clientId", ProjectionType::All, IndexStatus::Active)];
        assert_eq!(
            check_index("grants", &gsis, &key_index()),
            Err(RepositoryError::InvalidData(
                "Index KeyIndex on table grants is not hashed on key".to_string()
            ))
        );
    }

    #[test]
    fn test_check_index_partial_projection() {
        for projection in [ProjectionType::KeysOnly, ProjectionType::Include] {
            let gsis = [described("key", projection, IndexStatus::Active)];
            assert!(matches!(
                check_index("grants", &gsis, &key_index()),
                Err(RepositoryError::InvalidData(_))
            ));
        }
    }

    #[test]
    fn test_page_drops_empty_last_key() {
        let result = page(None, Some(Item::new()));
        assert!(result.items.is_empty());
        assert!(!result.has_more());
    }
}
