//! Result-set column descriptors.

use serde::{Deserialize, Serialize};

/// Name and reported type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Column name as reported by the data source.
    pub name: String,
    /// Type name as reported by the data source.
    pub type_name: String,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}
