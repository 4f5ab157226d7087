//! Catalog metadata records.

use serde::{Deserialize, Serialize};

/// A table or view known to the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableMetadata {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Dotted display name, omitting empty qualifiers.
    pub fn qualified_name(&self) -> String {
        [&self.catalog, &self.schema, &self.table]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A column of a table or view known to the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub column: String,
    pub datatype: String,
}

impl ColumnMetadata {
    pub fn new(
        table: &TableMetadata,
        column: impl Into<String>,
        datatype: impl Into<String>,
    ) -> Self {
        Self {
            catalog: table.catalog.clone(),
            schema: table.schema.clone(),
            table: table.table.clone(),
            column: column.into(),
            datatype: datatype.into(),
        }
    }
}
