use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// Absence of a record is never an error: lookups return `Ok(None)` or an
/// empty `Vec` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Index {index} missing on table {table}")]
    MissingIndex { table: String, index: String },
    #[error("Bulk delete aborted after {deleted} deletions: {source}")]
    PartialDeletion {
        deleted: usize,
        source: Box<RepositoryError>,
    },
}

impl RepositoryError {
    /// Returns true for caller mistakes that were rejected before any I/O.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RepositoryError::InvalidArgument(_))
    }

    /// Number of records removed before a bulk delete failed, if known.
    pub fn deleted_before_failure(&self) -> Option<usize> {
        match self {
            RepositoryError::PartialDeletion { deleted, .. } => Some(*deleted),
            _ => None,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
