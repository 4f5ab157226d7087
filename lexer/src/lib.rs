//! SQLBook Lexer
//!
//! This crate finds statement boundaries in SQL text that arrives in
//! fragments (for example one terminal line at a time):
//! - Boundary lexing that honors string literals, quoted identifiers,
//!   line and block comments, and parenthesis nesting
//! - Splitting of dotted `catalog.schema.table` names with the same quoting rules
//!
//! It does not parse or validate SQL beyond that.

mod boundary;
mod dotted;

pub use boundary::{scan, LexerState, StatementLexer};
pub use dotted::split_dotted_name;
