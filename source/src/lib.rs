//! SQLBook Data Sources
//!
//! This crate defines what a query session needs from a database:
//! - The `DataSource` and `Cursor` traits
//! - A SQLite implementation backed by rusqlite
//! - A scripted in-memory implementation for tests

mod error;
mod memory;
mod sqlite;
mod traits;

pub use error::*;
pub use memory::{MemoryCursor, MemoryProbe, MemorySource};
pub use sqlite::{SqliteCursor, SqliteSource};
pub use traits::{Cursor, DataSource};
