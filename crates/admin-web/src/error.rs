//! Error types for the admin service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kidoo_database::DatabaseError;
use thiserror::Error;

/// Errors that can occur in the admin service.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl AdminError {
    fn status(&self) -> StatusCode {
        match self {
            AdminError::Database(err) => match err {
                DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseError::AlreadyExists { .. } => StatusCode::CONFLICT,
                DatabaseError::Validation(_)
                | DatabaseError::InvalidQuery(_)
                | DatabaseError::ForeignKey { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AdminError::Database(err) => err.to_string(),
        };

        tracing::error!(status = %status, "{}", self);

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = AdminError::from(DatabaseError::NotFound {
            entity: "Kidoo",
            id: "k-1".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = AdminError::from(DatabaseError::AlreadyExists {
            entity: "Tag",
            id: "t-1".to_string(),
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let bad = AdminError::from(DatabaseError::InvalidQuery("nope".to_string()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }
}
