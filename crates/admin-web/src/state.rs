//! Application state shared across handlers.

use kidoo_database::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}
