//! In-memory storage backend for testing.
//!
//! This module provides an in-memory implementation of the document table
//! that stores all rows in a `BTreeMap` wrapped in `Arc<RwLock<_>>`. This is
//! useful for testing and development scenarios where persistence is not
//! required.
//!
//! # Example
//!
//! ```rust,ignore
//! use grantstore::storage::inmemory::InMemoryTable;
//! use grantstore::storage::keys;
//!
//! let table = InMemoryTable::new(keys::grant_table_schema(keys::DEFAULT_GRANT_KEY_INDEX));
//! // Use table for testing...
//! ```

mod table;

pub use table::{InMemoryTable, TableOperation};
