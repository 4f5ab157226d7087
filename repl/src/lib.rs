//! SQLBook console library - interactive SQL against a data source.
//!
//! - `repl`: statement entry, meta-commands and paged execution
//! - `format`: text table rendering and help

mod format;
mod repl;

pub use format::{help_text, render_table};
pub use repl::{parse_meta, MetaCommand, Repl};
