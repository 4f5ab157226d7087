//! Common error messages used across SQLBook components.
//!
//! These constants keep the session, the RPC layer and the console
//! reporting the same text for the same condition.

/// Error: a query is already open on the session.
pub const ERR_SESSION_BUSY: &str = "Please finish your existing query before running another one";

/// Error: the operation needs an open query.
pub const ERR_NO_ACTIVE_QUERY: &str = "Cannot call this function without a current query";

/// Error: quit was called while a query is open.
pub const ERR_QUERY_STILL_OPEN: &str = "Cannot quit before finishing current query";

/// Error: count was called on a statement that returns data.
pub const ERR_RESULT_SET_HAS_NO_COUNT: &str =
    "Cannot get result count from query that returns data";

/// Error: page was called on a statement that returns no data.
pub const ERR_NO_RESULT_SET: &str = "Cannot page a query that returns no data; use count";

/// Error: the session has been terminated.
pub const ERR_SESSION_TERMINATED: &str = "Session has been terminated";

/// Error: the data source connection was closed.
pub const ERR_SOURCE_CLOSED: &str = "Data source connection is closed";

/// Error: the console could not find a statement boundary.
pub const ERR_COULD_NOT_PARSE: &str = "Could not parse SQL";
