mod operations;
mod types;

pub use operations::validate_client;
pub use types::{Client, ClientSecret};
