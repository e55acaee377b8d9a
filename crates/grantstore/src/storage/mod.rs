//! Storage backend implementations.
//!
//! The repositories in [`crate::repository`] are written against the
//! [`DocumentTable`] trait and never see the backend directly. Two backends
//! are provided:
//!
//! - [`dynamodb::DynamoDbTable`]: AWS DynamoDB via `aws-sdk-dynamodb`
//! - [`inmemory::InMemoryTable`]: a process-local table with DynamoDB paging
//!   semantics, used by the tests and for local development
//!
//! [`keys`] and [`conversions`] describe how clients and grants are laid out
//! in a table; they are shared by both backends.

pub mod conversions;
pub mod dynamodb;
pub mod inmemory;
pub mod keys;
mod table;

pub use table::{AttributeFilter, DocumentTable, IndexSchema, Item, KeyQuery, KeySchema, Page};
