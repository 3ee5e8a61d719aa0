//! Database error types.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Record already exists (unique constraint)
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// A referenced parent record does not exist
    #[error("{entity} references a missing record: {id}")]
    ForeignKey { entity: &'static str, id: String },

    /// Input rejected before reaching the database
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Query arguments that cannot be executed (e.g. bad group-by ordering)
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl DatabaseError {
    /// Classify an error raised by an INSERT or UPDATE.
    ///
    /// Unique violations become `AlreadyExists`, foreign-key violations become
    /// `ForeignKey`, anything else stays a plain `Sqlx` error.
    pub(crate) fn from_write(
        err: sqlx::Error,
        entity: &'static str,
        id: impl Into<String>,
    ) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity,
                    id: id.into(),
                };
            }
            if db_err.is_foreign_key_violation() {
                return DatabaseError::ForeignKey {
                    entity,
                    id: id.into(),
                };
            }
        }
        DatabaseError::Sqlx(err)
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DatabaseError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether this error is a `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
