//! DynamoDB storage backend implementation.
//!
//! This module provides a DynamoDB-based implementation of the document table
//! using `aws-sdk-dynamodb`.

mod error;
mod table;

pub use table::DynamoDbTable;
