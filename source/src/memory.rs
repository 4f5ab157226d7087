//! Scripted in-memory data source.
//!
//! Responses are registered per SQL text. The source and every cursor it
//! hands out share a `MemoryProbe`, so callers can check afterwards that
//! cursors were released and the connection was closed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use sqlbook_core::{ColumnDescriptor, ColumnMetadata, TableMetadata, Value};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::traits::{Cursor, DataSource};

#[derive(Debug, Clone)]
enum Script {
    ResultSet {
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<Value>>,
        fail_after: Option<usize>,
    },
    Update {
        affected: u64,
    },
    Failure {
        message: String,
    },
}

/// Shared view of a `MemorySource`'s resources.
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe {
    open_cursors: Arc<AtomicUsize>,
    executions: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MemoryProbe {
    /// Cursors handed out and not yet closed.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of `execute` calls that reached the source.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A data source that answers from registered scripts.
#[derive(Debug, Default)]
pub struct MemorySource {
    scripts: HashMap<String, Script>,
    tables: Vec<TableMetadata>,
    views: Vec<TableMetadata>,
    columns: Vec<ColumnMetadata>,
    close_failure: Option<String>,
    probe: MemoryProbe,
}

/// Statements are looked up with whitespace runs collapsed and without a
/// trailing `;`.
fn script_key(sql: &str) -> String {
    let sql = sql.trim().trim_end_matches(';');
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn descriptors(columns: &[(&str, &str)]) -> Vec<ColumnDescriptor> {
    columns
        .iter()
        .map(|(name, type_name)| ColumnDescriptor::new(*name, *type_name))
        .collect()
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with a result set.
    pub fn with_result_set(
        mut self,
        sql: &str,
        columns: &[(&str, &str)],
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.scripts.insert(
            script_key(sql),
            Script::ResultSet {
                columns: descriptors(columns),
                rows,
                fail_after: None,
            },
        );
        self
    }

    /// Answer `sql` with a result set whose cursor fails after `after` rows.
    pub fn with_failing_result_set(
        mut self,
        sql: &str,
        columns: &[(&str, &str)],
        rows: Vec<Vec<Value>>,
        after: usize,
    ) -> Self {
        self.scripts.insert(
            script_key(sql),
            Script::ResultSet {
                columns: descriptors(columns),
                rows,
                fail_after: Some(after),
            },
        );
        self
    }

    /// Answer `sql` as a statement without a result set.
    pub fn with_update(mut self, sql: &str, affected: u64) -> Self {
        self.scripts
            .insert(script_key(sql), Script::Update { affected });
        self
    }

    /// Make `sql` fail at execute time.
    pub fn with_failure(mut self, sql: &str, message: impl Into<String>) -> Self {
        self.scripts.insert(
            script_key(sql),
            Script::Failure {
                message: message.into(),
            },
        );
        self
    }

    /// Register a table and its `(column, datatype)` pairs.
    pub fn with_table(mut self, table: TableMetadata, columns: &[(&str, &str)]) -> Self {
        self.register_columns(&table, columns);
        self.tables.push(table);
        self
    }

    /// Register a view and its `(column, datatype)` pairs.
    pub fn with_view(mut self, view: TableMetadata, columns: &[(&str, &str)]) -> Self {
        self.register_columns(&view, columns);
        self.views.push(view);
        self
    }

    /// Make `close` fail after marking the connection closed.
    pub fn with_failing_close(mut self, message: impl Into<String>) -> Self {
        self.close_failure = Some(message.into());
        self
    }

    pub fn probe(&self) -> MemoryProbe {
        self.probe.clone()
    }

    fn register_columns(&mut self, table: &TableMetadata, columns: &[(&str, &str)]) {
        for (column, datatype) in columns {
            self.columns
                .push(ColumnMetadata::new(table, *column, *datatype));
        }
    }

    fn ensure_open(&self) -> SourceResult<()> {
        if self.probe.is_closed() {
            return Err(SourceError::Closed);
        }
        Ok(())
    }
}

impl DataSource for MemorySource {
    type Cursor = MemoryCursor;

    fn execute(&mut self, sql: &str) -> SourceResult<MemoryCursor> {
        self.ensure_open()?;
        self.probe.executions.fetch_add(1, Ordering::SeqCst);

        let key = script_key(sql);
        let script = self
            .scripts
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::query(format!("no such statement: {}", key)))?;

        let cursor = match script {
            Script::ResultSet {
                columns,
                rows,
                fail_after,
            } => MemoryCursor {
                columns,
                rows: rows.into(),
                affected: 0,
                fail_after,
                served: 0,
                closed: false,
                probe: self.probe.clone(),
            },
            Script::Update { affected } => MemoryCursor {
                columns: Vec::new(),
                rows: VecDeque::new(),
                affected,
                fail_after: None,
                served: 0,
                closed: false,
                probe: self.probe.clone(),
            },
            Script::Failure { message } => return Err(SourceError::query(message)),
        };

        self.probe.open_cursors.fetch_add(1, Ordering::SeqCst);
        debug!(sql = %key, "memory source opened cursor");
        Ok(cursor)
    }

    fn tables(&mut self) -> SourceResult<Vec<TableMetadata>> {
        self.ensure_open()?;
        Ok(self.tables.clone())
    }

    fn views(&mut self) -> SourceResult<Vec<TableMetadata>> {
        self.ensure_open()?;
        Ok(self.views.clone())
    }

    fn columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> SourceResult<Vec<ColumnMetadata>> {
        self.ensure_open()?;
        let matches = |filter: Option<&str>, value: &str| filter.map_or(true, |f| f == value);
        Ok(self
            .columns
            .iter()
            .filter(|c| {
                matches(catalog, &c.catalog) && matches(schema, &c.schema) && matches(table, &c.table)
            })
            .cloned()
            .collect())
    }

    fn close(&mut self) -> SourceResult<()> {
        if self.probe.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match self.close_failure.take() {
            Some(message) => Err(SourceError::query(message)),
            None => Ok(()),
        }
    }
}

/// Cursor handed out by `MemorySource`.
#[derive(Debug)]
pub struct MemoryCursor {
    columns: Vec<ColumnDescriptor>,
    rows: VecDeque<Vec<Value>>,
    affected: u64,
    fail_after: Option<usize>,
    served: usize,
    closed: bool,
    probe: MemoryProbe,
}

impl Cursor for MemoryCursor {
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
        if self.fail_after == Some(self.served) {
            return Err(SourceError::query(format!(
                "cursor failed after {} rows",
                self.served
            )));
        }
        let row = self.rows.pop_front();
        if row.is_some() {
            self.served += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> SourceResult<()> {
        if !self.closed {
            self.closed = true;
            self.probe.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
