//! grantstore_core - domain types and storage contracts for client
//! registrations and persisted grants.
//!
//! Everything in this crate is pure: no I/O, no store client. Backends live
//! in the `grantstore` crate and implement [`storage::ClientStore`] and
//! [`storage::PersistedGrantStore`].

pub mod client;
pub mod grant;
pub mod storage;
