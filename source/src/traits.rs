//! Data source and cursor abstractions.

use sqlbook_core::{ColumnDescriptor, ColumnMetadata, TableMetadata, Value};

use crate::error::SourceResult;

/// Forward-only read position into the result of one statement.
pub trait Cursor {
    /// Columns projected by the statement; empty if it produced no result set.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Rows changed by a statement without a result set.
    fn records_affected(&self) -> u64;

    /// Next row in cursor order, or `None` once the cursor is exhausted.
    fn next_row(&mut self) -> SourceResult<Option<Vec<Value>>>;

    /// Release the cursor. Calling it again is a no-op.
    fn close(&mut self) -> SourceResult<()>;
}

/// An open connection that runs SQL text.
pub trait DataSource {
    type Cursor: Cursor;

    /// Run one statement and return a cursor over its result.
    fn execute(&mut self, sql: &str) -> SourceResult<Self::Cursor>;

    /// Tables visible through the connection.
    fn tables(&mut self) -> SourceResult<Vec<TableMetadata>>;

    /// Views visible through the connection.
    fn views(&mut self) -> SourceResult<Vec<TableMetadata>>;

    /// Columns of the matching tables and views. `None` matches anything.
    fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> SourceResult<Vec<ColumnMetadata>>;

    /// Close the connection. Calling it again is a no-op.
    fn close(&mut self) -> SourceResult<()>;
}
