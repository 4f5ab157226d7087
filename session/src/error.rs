//! Session error types.

use sqlbook_core::messages;
use sqlbook_source::SourceError;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A query is already open.
    #[error("{}", messages::ERR_SESSION_BUSY)]
    SessionBusy,

    /// The operation needs an open query.
    #[error("{}", messages::ERR_NO_ACTIVE_QUERY)]
    NoActiveQuery,

    /// Quit while a query is open.
    #[error("{}", messages::ERR_QUERY_STILL_OPEN)]
    QueryStillOpen,

    /// Page size must be positive.
    #[error("page size must be positive, got {size}")]
    InvalidPageSize { size: i64 },

    /// Count on a statement that returns data.
    #[error("{}", messages::ERR_RESULT_SET_HAS_NO_COUNT)]
    ResultSetHasNoCount,

    /// Page on a statement that returns no data.
    #[error("{}", messages::ERR_NO_RESULT_SET)]
    NoResultSet,

    /// The session has quit.
    #[error("{}", messages::ERR_SESSION_TERMINATED)]
    SessionTerminated,

    /// Invalid session configuration.
    #[error("invalid session config: {message}")]
    InvalidConfig { message: String },

    /// Failure reported by the data source.
    #[error("{0}")]
    Source(#[from] SourceError),
}

impl SessionError {
    pub fn invalid_page_size(size: i64) -> Self {
        Self::InvalidPageSize { size }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Variant name, as reported to remote callers.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::SessionBusy => "SessionBusy",
            SessionError::NoActiveQuery => "NoActiveQuery",
            SessionError::QueryStillOpen => "QueryStillOpen",
            SessionError::InvalidPageSize { .. } => "InvalidPageSize",
            SessionError::ResultSetHasNoCount => "ResultSetHasNoCount",
            SessionError::NoResultSet => "NoResultSet",
            SessionError::SessionTerminated => "SessionTerminated",
            SessionError::InvalidConfig { .. } => "InvalidConfig",
            SessionError::Source(_) => "SourceError",
        }
    }

    /// Whether this is a call-ordering error that left the session untouched.
    pub fn is_sequencing(&self) -> bool {
        !matches!(
            self,
            SessionError::Source(_) | SessionError::InvalidConfig { .. }
        )
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
