//! SQLBook Session
//!
//! One query session over one data-source connection.
//!
//! Responsibilities:
//! - Run one statement at a time and hold its cursor
//! - Hand out column metadata, affected-row counts and pages of rows
//! - Enforce call ordering (execute, page, finish, quit)
//! - Release the cursor and the connection on every exit path

mod config;
mod error;
mod result;
mod session;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use result::AffectedRows;
pub use session::{QuerySession, SessionState};
