//! Session result types.

/// Rows changed by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedRows {
    /// The statement produced no result set and changed this many rows.
    Count(u64),
    /// The statement produced a result set.
    NotApplicable,
}

impl AffectedRows {
    /// Get the count, if there is one.
    pub fn count(&self) -> Option<u64> {
        match self {
            AffectedRows::Count(n) => Some(*n),
            AffectedRows::NotApplicable => None,
        }
    }
}
