mod filter;
mod operations;
mod types;

pub use filter::GrantFilter;
pub use operations::validate_grant;
pub use types::{GrantType, PersistedGrant};
