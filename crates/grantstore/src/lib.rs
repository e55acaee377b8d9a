//! DynamoDB persistence for OAuth/OIDC client registrations and persisted
//! grants.
//!
//! The contracts ([`ClientStore`], [`PersistedGrantStore`]) and domain types
//! live in `grantstore_core`. This crate provides:
//!
//! - [`storage`]: the [`DocumentTable`](storage::DocumentTable) seam with a
//!   DynamoDB and an in-memory backend, plus the table layout
//! - [`repository`]: [`ClientRepository`] and [`GrantRepository`]
//! - [`config`]: environment configuration and SDK client setup
//! - [`Stores`]: both repositories wired to DynamoDB
//!
//! Logging goes through `tracing`; installing a subscriber is up to the host.

pub mod config;
pub mod repository;
pub mod storage;
mod stores;

pub use config::{create_client, BulkDeleteStrategy, ConfigError, StoreConfig};
pub use grantstore_core::storage::{ClientStore, PersistedGrantStore, RepositoryError, Result};
pub use repository::{ClientRepository, GrantRepository};
pub use stores::Stores;
