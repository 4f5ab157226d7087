//! Data source error types.

use sqlbook_core::messages;
use thiserror::Error;

/// Data source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Error reported by SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection or cursor has already been closed.
    #[error("{}", messages::ERR_SOURCE_CLOSED)]
    Closed,

    /// Query failure reported by a non-SQLite source.
    #[error("query failed: {message}")]
    Query { message: String },
}

impl SourceError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Result type for data source operations.
pub type SourceResult<T> = Result<T, SourceError>;
