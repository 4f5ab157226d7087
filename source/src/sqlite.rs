//! SQLite data source.
//!
//! rusqlite statements borrow their connection, so a cursor cannot keep a
//! statement stepping across calls. A read-only query is instead wrapped as
//! `SELECT * FROM (<sql>) LIMIT ? OFFSET ?` and fetched one batch at a time,
//! with the cursor holding the offset. Statements that cannot be wrapped
//! (`PRAGMA`, `EXPLAIN`, writes with `RETURNING`) run exactly once and have
//! their rows buffered.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Statement};
use sqlbook_core::{ColumnDescriptor, ColumnMetadata, TableMetadata, Value, DEFAULT_PAGE_SIZE};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::traits::{Cursor, DataSource};

/// Catalog name SQLite reports for the primary database.
const MAIN_CATALOG: &str = "main";

/// Type name reported for expression columns without a declared type.
const ANY_TYPE: &str = "ANY";

/// Connection shared between a source and its cursors. `None` once closed.
type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// A SQLite connection.
pub struct SqliteSource {
    conn: SharedConnection,
    fetch_size: usize,
}

impl SqliteSource {
    /// Open a database file, or `:memory:` for a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening sqlite database");
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> SourceResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            fetch_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Rows a cursor pulls from SQLite per round trip. Zero is treated as one.
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    fn list_master(&self, kind: &str) -> SourceResult<Vec<TableMetadata>> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(SourceError::Closed)?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt.query_map([kind], |row| row.get::<_, String>(0))?;

        let mut tables = Vec::new();
        for name in names {
            tables.push(TableMetadata::new(MAIN_CATALOG, "", name?));
        }
        Ok(tables)
    }

    fn table_columns(&self, table: &TableMetadata) -> SourceResult<Vec<ColumnMetadata>> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(SourceError::Closed)?;
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([&table.table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, datatype) = row?;
            columns.push(ColumnMetadata::new(table, name, datatype));
        }
        Ok(columns)
    }
}

/// Wrap a query so it can be fetched by `LIMIT`/`OFFSET`. The newlines keep
/// a trailing line comment from swallowing the closing parenthesis.
fn paged_sql(sql: &str) -> String {
    let query = sql.trim().trim_end_matches(';').trim_end();
    format!("SELECT * FROM (\n{}\n) LIMIT ?1 OFFSET ?2", query)
}

impl DataSource for SqliteSource {
    type Cursor = SqliteCursor;

    fn execute(&mut self, sql: &str) -> SourceResult<SqliteCursor> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(SourceError::Closed)?;
        debug!(sql, "executing statement");

        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<ColumnDescriptor> = stmt
            .columns()
            .iter()
            .map(|c| ColumnDescriptor::new(c.name(), c.decl_type().unwrap_or(ANY_TYPE)))
            .collect();

        if columns.is_empty() {
            let affected = stmt.execute([])?;
            debug!(affected, "statement produced no result set");
            return Ok(SqliteCursor::without_rows(affected as u64));
        }

        if stmt.readonly() {
            let paged = paged_sql(sql);
            if conn.prepare_cached(&paged).is_ok() {
                debug!(columns = columns.len(), "statement opened as paged cursor");
                return Ok(SqliteCursor::paged(
                    Arc::clone(&self.conn),
                    columns,
                    paged,
                    self.fetch_size,
                ));
            }
        }

        let buffered = read_rows(&mut stmt, columns.len())?;
        debug!(
            columns = columns.len(),
            rows = buffered.len(),
            "statement result buffered"
        );
        Ok(SqliteCursor::buffered(columns, buffered))
    }

    fn tables(&mut self) -> SourceResult<Vec<TableMetadata>> {
        self.list_master("table")
    }

    fn views(&mut self) -> SourceResult<Vec<TableMetadata>> {
        self.list_master("view")
    }

    fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> SourceResult<Vec<ColumnMetadata>> {
        // SQLite has a single catalog and no schemas.
        if catalog.is_some_and(|c| !c.is_empty() && !c.eq_ignore_ascii_case(MAIN_CATALOG))
            || schema.is_some_and(|s| !s.is_empty())
        {
            return Ok(Vec::new());
        }

        let mut relations = self.list_master("table")?;
        relations.extend(self.list_master("view")?);

        let mut columns = Vec::new();
        for relation in relations
            .iter()
            .filter(|r| table.map_or(true, |t| r.table.eq_ignore_ascii_case(t)))
        {
            columns.extend(self.table_columns(relation)?);
        }
        Ok(columns)
    }

    fn close(&mut self) -> SourceResult<()> {
        if let Some(conn) = self.conn.lock().take() {
            debug!("closing sqlite connection");
            conn.close().map_err(|(_, err)| err)?;
        }
        Ok(())
    }
}

fn read_rows(stmt: &mut Statement<'_>, width: usize) -> SourceResult<VecDeque<Vec<Value>>> {
    let mut rows = stmt.query([])?;
    let mut buffered = VecDeque::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(value_from_ref(row.get_ref(i)?));
        }
        buffered.push_back(values);
    }
    Ok(buffered)
}

/// Where the rest of a result comes from.
#[derive(Debug)]
enum Remaining {
    /// Further batches are fetched from the wrapped query.
    Paged {
        conn: SharedConnection,
        sql: String,
        offset: usize,
        fetch_size: usize,
    },
    /// Everything is already in the buffer.
    Buffered,
}

/// Cursor over the result of one SQLite statement.
#[derive(Debug)]
pub struct SqliteCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
    remaining: Remaining,
    affected: u64,
    closed: bool,
}

impl SqliteCursor {
    fn paged(
        conn: SharedConnection,
        columns: Vec<ColumnDescriptor>,
        sql: String,
        fetch_size: usize,
    ) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
            remaining: Remaining::Paged {
                conn,
                sql,
                offset: 0,
                fetch_size,
            },
            affected: 0,
            closed: false,
        }
    }

    fn buffered(columns: Vec<ColumnDescriptor>, rows: VecDeque<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            remaining: Remaining::Buffered,
            affected: 0,
            closed: false,
        }
    }

    fn without_rows(affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: VecDeque::new(),
            remaining: Remaining::Buffered,
            affected,
            closed: false,
        }
    }

    /// Pull the next batch into the buffer. A short batch ends the result.
    fn fetch_batch(&mut self) -> SourceResult<()> {
        let Remaining::Paged {
            conn,
            sql,
            offset,
            fetch_size,
        } = &mut self.remaining
        else {
            return Ok(());
        };

        let fetched = {
            let guard = conn.lock();
            let conn = guard.as_ref().ok_or(SourceError::Closed)?;
            let mut stmt = conn.prepare_cached(sql)?;
            let mut rows = stmt.query(params![*fetch_size as i64, *offset as i64])?;
            let mut fetched = 0;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(self.columns.len());
                for i in 0..self.columns.len() {
                    values.push(value_from_ref(row.get_ref(i)?));
                }
                self.rows.push_back(values);
                fetched += 1;
            }
            fetched
        };

        debug!(offset = *offset, fetched, "fetched batch");
        *offset += fetched;
        if fetched < *fetch_size {
            self.remaining = Remaining::Buffered;
        }
        Ok(())
    }
}

impl Cursor for SqliteCursor {
    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn records_affected(&self) -> u64 {
        self.affected
    }

    fn next_row(&mut self) -> SourceResult<Option<Vec<Value>>> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        if self.rows.is_empty() {
            self.fetch_batch()?;
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> SourceResult<()> {
        self.closed = true;
        self.rows.clear();
        self.remaining = Remaining::Buffered;
        Ok(())
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}
