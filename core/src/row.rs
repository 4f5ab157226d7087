//! Wire rows and pages.
//!
//! A row maps column names to nullable strings. Cells are kept in column
//! order so the serialized object lists them in the order the query
//! projected them. Keys are unique within a row: a repeated column name
//! gets a `_1`, `_2`, ... suffix.

use std::collections::HashSet;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{ColumnDescriptor, Value};

/// A bounded batch of rows returned by one page call.
pub type RowPage = Vec<Row>;

/// One result row with every cell rendered to its wire form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<(String, Option<String>)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a row of typed values against the query's columns.
    ///
    /// Columns without a matching value render as null.
    pub fn render(columns: &[ColumnDescriptor], values: &[Value]) -> Self {
        let mut taken = HashSet::with_capacity(columns.len());
        let cells = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let cell = values.get(i).and_then(Value::render);
                (unique_key(&mut taken, &column.name), cell)
            })
            .collect();
        Self { cells }
    }

    /// Append a cell.
    pub fn push(&mut self, column: impl Into<String>, cell: Option<String>) {
        self.cells.push((column.into(), cell));
    }

    /// Get a cell by column name. The outer option is "no such column".
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell.as_deref())
    }

    /// Iterate cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(name, cell)| (name.as_str(), cell.as_deref()))
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn unique_key(taken: &mut HashSet<String>, name: &str) -> String {
    let mut key = name.to_string();
    let mut suffix = 0;
    while taken.contains(&key) {
        suffix += 1;
        key = format!("{}_{}", name, suffix);
    }
    taken.insert(key.clone());
    key
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, cell) in &self.cells {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
        ]
    }

    #[test]
    fn test_render_row() {
        // GIVEN
        let values = vec![Value::Integer(7), Value::Null];

        // WHEN
        let row = Row::render(&columns(), &values);

        // THEN
        assert_eq!(row.get("id"), Some(Some("7")));
        assert_eq!(row.get("name"), Some(None));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_serializes_as_ordered_object_with_null() {
        // GIVEN
        let row = Row::render(&columns(), &[Value::Integer(1), Value::Null]);

        // WHEN
        let json = serde_json::to_string(&row).unwrap();

        // THEN
        assert_eq!(json, r#"{"id":"1","name":null}"#);
    }

    #[test]
    fn test_repeated_column_names_get_suffixes() {
        // GIVEN
        let columns = vec![
            ColumnDescriptor::new("a", "ANY"),
            ColumnDescriptor::new("a", "ANY"),
            ColumnDescriptor::new("a_1", "ANY"),
            ColumnDescriptor::new("a", "ANY"),
        ];
        let values = vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
            Value::Integer(4),
        ];

        // WHEN
        let row = Row::render(&columns, &values);

        // THEN
        let keys: Vec<&str> = row.cells().map(|(name, _)| name).collect();
        assert_eq!(keys, vec!["a", "a_1", "a_1_1", "a_2"]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"a":"1","a_1":"2","a_1_1":"3","a_2":"4"}"#
        );
    }

    #[test]
    fn test_short_value_list_renders_null() {
        let row = Row::render(&columns(), &[Value::Integer(1)]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("name"), Some(None));
    }
}
