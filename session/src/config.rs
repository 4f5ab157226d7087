//! Session configuration.

use sqlbook_core::DEFAULT_PAGE_SIZE;

use crate::error::{SessionError, SessionResult};

/// Tuning for a query session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    max_page_size: usize,
}

impl SessionConfig {
    /// Create a configuration with the given upper bound on page size.
    pub fn new(max_page_size: usize) -> SessionResult<Self> {
        if max_page_size == 0 {
            return Err(SessionError::invalid_config(
                "max page size must be at least 1",
            ));
        }
        Ok(Self { max_page_size })
    }

    /// Upper bound on the number of rows in one page.
    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
