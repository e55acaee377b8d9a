//! grantstore_cli - operator CLI for the client and grant tables.

pub mod cli;
pub mod commands;
pub mod output;
