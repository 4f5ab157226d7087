//! SQLBook Core Types
//!
//! This crate provides the foundational types shared by every SQLBook component:
//! - Cell values as yielded by a data source (the Value enum)
//! - Column descriptors for result sets
//! - Wire rows and pages (cells rendered to nullable strings)
//! - Catalog metadata records (tables, views, columns)
//! - Common error messages

mod catalog;
mod column;
pub mod messages;
mod row;
mod value;

pub use catalog::*;
pub use column::*;
pub use row::*;
pub use value::*;

/// Default upper bound on the number of rows returned by one page.
pub const DEFAULT_PAGE_SIZE: usize = 100;
