//! Single-use email verification tokens.

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::VerificationToken;
use crate::validation::validate_required;

/// Store a verification token for an identifier (usually an email).
pub async fn create_verification_token<'e>(
    executor: impl SqliteExecutor<'e>,
    identifier: &str,
    token: &str,
    expires: DateTime<Utc>,
) -> Result<VerificationToken> {
    validate_required("identifier", identifier)?;
    validate_required("token", token)?;

    let record = sqlx::query_as::<_, VerificationToken>(
        r#"
        INSERT INTO "VerificationToken" (identifier, token, expires)
        VALUES (?, ?, ?)
        RETURNING identifier, token, expires
        "#,
    )
    .bind(identifier)
    .bind(token)
    .bind(expires)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "VerificationToken", identifier))?;

    Ok(record)
}

/// Consume a token.
///
/// The row is deleted whether or not it has expired, so a token can be used
/// at most once. Returns `None` when no such token exists.
pub async fn use_verification_token<'e>(
    executor: impl SqliteExecutor<'e>,
    identifier: &str,
    token: &str,
) -> Result<Option<VerificationToken>> {
    let record = sqlx::query_as::<_, VerificationToken>(
        r#"
        DELETE FROM "VerificationToken"
        WHERE identifier = ? AND token = ?
        RETURNING identifier, token, expires
        "#,
    )
    .bind(identifier)
    .bind(token)
    .fetch_optional(executor)
    .await?;

    if record.is_some() {
        tracing::debug!(identifier = %identifier, "Consumed verification token");
    }

    Ok(record)
}

/// Purge expired tokens. Returns the number removed.
pub async fn delete_expired_tokens<'e>(executor: impl SqliteExecutor<'e>) -> Result<u64> {
    let result = sqlx::query(r#"DELETE FROM "VerificationToken" WHERE expires <= ?"#)
        .bind(Utc::now())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
