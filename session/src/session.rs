//! Query session state machine.

use std::mem;

use sqlbook_core::{ColumnDescriptor, ColumnMetadata, Row, RowPage, TableMetadata};
use sqlbook_source::{Cursor, DataSource, SourceResult};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::result::AffectedRows;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No query is open.
    Idle,
    /// A query is open and holds a cursor.
    QueryOpen,
    /// The session has quit. Nothing is valid any more.
    Terminated,
}

/// The statement currently being read.
struct OpenQuery<C> {
    cursor: C,
    columns: Vec<ColumnDescriptor>,
    affected: AffectedRows,
    exhausted: bool,
}

impl<C: Cursor> OpenQuery<C> {
    fn fill_page(&mut self, size: usize) -> SourceResult<RowPage> {
        let mut page = RowPage::with_capacity(size);
        if self.exhausted {
            return Ok(page);
        }
        while page.len() < size {
            match self.cursor.next_row()? {
                Some(values) => page.push(Row::render(&self.columns, &values)),
                None => {
                    self.exhausted = true;
                    break;
                }
            }
        }
        Ok(page)
    }
}

enum Phase<C> {
    Idle,
    QueryOpen(OpenQuery<C>),
    Terminated,
}

/// A query session over one data-source connection.
///
/// At most one statement is open at a time. The session owns the
/// connection, and while a query is open it owns that query's cursor.
/// Dropping the session closes both.
pub struct QuerySession<S: DataSource> {
    source: S,
    config: SessionConfig,
    phase: Phase<S::Cursor>,
}

impl<S: DataSource> QuerySession<S> {
    /// Create a session with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, SessionConfig::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(source: S, config: SessionConfig) -> Self {
        Self {
            source,
            config,
            phase: Phase::Idle,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::QueryOpen(_) => SessionState::QueryOpen,
            Phase::Terminated => SessionState::Terminated,
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run a statement and open it for reading.
    pub fn execute(&mut self, sql: &str) -> SessionResult<()> {
        match self.phase {
            Phase::Idle => {}
            Phase::QueryOpen(_) => return Err(SessionError::SessionBusy),
            Phase::Terminated => return Err(SessionError::SessionTerminated),
        }

        debug!(sql, "executing");
        let cursor = self.source.execute(sql).map_err(|err| {
            warn!(error = %err, "execute failed");
            err
        })?;

        let columns = cursor.columns().to_vec();
        let affected = if columns.is_empty() {
            AffectedRows::Count(cursor.records_affected())
        } else {
            AffectedRows::NotApplicable
        };
        info!(columns = columns.len(), ?affected, "query opened");

        self.phase = Phase::QueryOpen(OpenQuery {
            cursor,
            columns,
            affected,
            exhausted: false,
        });
        Ok(())
    }

    /// Column descriptors of the open query. Empty if it has no result set.
    pub fn metadata(&self) -> SessionResult<&[ColumnDescriptor]> {
        Ok(&self.open_query()?.columns)
    }

    /// Rows changed by the open query.
    pub fn count(&self) -> SessionResult<u64> {
        self.open_query()?
            .affected
            .count()
            .ok_or(SessionError::ResultSetHasNoCount)
    }

    /// Fetch the next page of at most `max_size` rows.
    ///
    /// The size is capped at the configured maximum. An exhausted query
    /// keeps returning empty pages. If the cursor fails, the query is
    /// closed and the session goes back to idle.
    pub fn page(&mut self, max_size: i64) -> SessionResult<RowPage> {
        let limit = self.config.max_page_size();
        let query = self.open_query_mut()?;
        if max_size <= 0 {
            return Err(SessionError::invalid_page_size(max_size));
        }
        if query.columns.is_empty() {
            return Err(SessionError::NoResultSet);
        }

        let size = usize::try_from(max_size).map_or(limit, |size| size.min(limit));
        match query.fill_page(size) {
            Ok(page) => {
                debug!(rows = page.len(), exhausted = query.exhausted, "page fetched");
                Ok(page)
            }
            Err(err) => {
                warn!(error = %err, "page failed, closing query");
                self.abandon_query();
                Err(err.into())
            }
        }
    }

    /// Fetch the next page at the configured maximum size.
    pub fn page_default(&mut self) -> SessionResult<RowPage> {
        let size = i64::try_from(self.config.max_page_size()).unwrap_or(i64::MAX);
        self.page(size)
    }

    /// Close the open query and go back to idle.
    pub fn finish(&mut self) -> SessionResult<()> {
        match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::QueryOpen(mut query) => {
                info!("query finished");
                query.cursor.close()?;
                Ok(())
            }
            Phase::Idle => Err(SessionError::NoActiveQuery),
            Phase::Terminated => {
                self.phase = Phase::Terminated;
                Err(SessionError::SessionTerminated)
            }
        }
    }

    /// Close the connection and terminate the session.
    pub fn quit(&mut self) -> SessionResult<()> {
        match self.phase {
            Phase::Idle => {}
            Phase::QueryOpen(_) => return Err(SessionError::QueryStillOpen),
            Phase::Terminated => return Err(SessionError::SessionTerminated),
        }
        info!("session quitting");
        self.phase = Phase::Terminated;
        self.source.close()?;
        Ok(())
    }

    /// Tables visible through the connection.
    pub fn tables(&mut self) -> SessionResult<Vec<TableMetadata>> {
        self.ensure_live()?;
        Ok(self.source.tables()?)
    }

    /// Views visible through the connection.
    pub fn views(&mut self) -> SessionResult<Vec<TableMetadata>> {
        self.ensure_live()?;
        Ok(self.source.views()?)
    }

    /// Columns of matching tables and views. `None` matches anything.
    pub fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> SessionResult<Vec<ColumnMetadata>> {
        self.ensure_live()?;
        Ok(self.source.columns(catalog, schema, table)?)
    }

    fn ensure_live(&self) -> SessionResult<()> {
        match self.phase {
            Phase::Terminated => Err(SessionError::SessionTerminated),
            _ => Ok(()),
        }
    }

    fn open_query(&self) -> SessionResult<&OpenQuery<S::Cursor>> {
        match &self.phase {
            Phase::QueryOpen(query) => Ok(query),
            Phase::Idle => Err(SessionError::NoActiveQuery),
            Phase::Terminated => Err(SessionError::SessionTerminated),
        }
    }

    fn open_query_mut(&mut self) -> SessionResult<&mut OpenQuery<S::Cursor>> {
        match &mut self.phase {
            Phase::QueryOpen(query) => Ok(query),
            Phase::Idle => Err(SessionError::NoActiveQuery),
            Phase::Terminated => Err(SessionError::SessionTerminated),
        }
    }

    fn abandon_query(&mut self) {
        if let Phase::QueryOpen(mut query) = mem::replace(&mut self.phase, Phase::Idle) {
            if let Err(err) = query.cursor.close() {
                warn!(error = %err, "failed to close cursor");
            }
        }
    }
}

impl<S: DataSource> Drop for QuerySession<S> {
    fn drop(&mut self) {
        match mem::replace(&mut self.phase, Phase::Terminated) {
            Phase::Terminated => return,
            Phase::QueryOpen(mut query) => {
                debug!("closing cursor of dropped session");
                if let Err(err) = query.cursor.close() {
                    warn!(error = %err, "failed to close cursor");
                }
            }
            Phase::Idle => {}
        }
        if let Err(err) = self.source.close() {
            warn!(error = %err, "failed to close connection");
        }
    }
}
