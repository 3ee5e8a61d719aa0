//! Login sessions.

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Sqlite, SqliteExecutor};

use crate::error::{DatabaseError, Result};
use crate::models::{Session, User};
use crate::validation::validate_required;

/// Create a session for a user.
pub async fn create_session<'e>(
    executor: impl SqliteExecutor<'e>,
    session_token: &str,
    user_id: &str,
    expires: DateTime<Utc>,
) -> Result<Session> {
    validate_required("sessionToken", session_token)?;

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO "Session" (id, sessionToken, userId, expires)
        VALUES (?, ?, ?, ?)
        RETURNING id, sessionToken, userId, expires
        "#,
    )
    .bind(crate::new_id())
    .bind(session_token)
    .bind(user_id)
    .bind(expires)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "Session", session_token))?;

    tracing::debug!(user_id = %session.user_id, "Created session");
    Ok(session)
}

/// Find a session by its token, expired or not.
pub async fn find_session<'e>(
    executor: impl SqliteExecutor<'e>,
    session_token: &str,
) -> Result<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(
        r#"
        SELECT id, sessionToken, userId, expires
        FROM "Session"
        WHERE sessionToken = ?
        "#,
    )
    .bind(session_token)
    .fetch_optional(executor)
    .await?;

    Ok(session)
}

/// Resolve a live session and its user.
///
/// Expired sessions are reported as `NotFound`.
pub async fn get_session_and_user<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    session_token: &str,
) -> Result<(Session, User)> {
    let mut conn = conn.acquire().await?;
    let session = find_session(&mut *conn, session_token)
        .await?
        .filter(|s| s.expires > Utc::now())
        .ok_or_else(|| DatabaseError::not_found("Session", session_token))?;

    let user = crate::user::get_user(&mut *conn, &session.user_id).await?;
    Ok((session, user))
}

/// Move a session's expiry.
pub async fn update_session_expiry<'e>(
    executor: impl SqliteExecutor<'e>,
    session_token: &str,
    expires: DateTime<Utc>,
) -> Result<Session> {
    sqlx::query_as::<_, Session>(
        r#"
        UPDATE "Session"
        SET expires = ?
        WHERE sessionToken = ?
        RETURNING id, sessionToken, userId, expires
        "#,
    )
    .bind(expires)
    .bind(session_token)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Session", session_token))
}

/// Delete a session (logout).
pub async fn delete_session<'e>(
    executor: impl SqliteExecutor<'e>,
    session_token: &str,
) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM "Session" WHERE sessionToken = ?"#)
        .bind(session_token)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Session", session_token));
    }

    Ok(())
}

/// Purge sessions that expired before now. Returns the number removed.
pub async fn delete_expired_sessions<'e>(executor: impl SqliteExecutor<'e>) -> Result<u64> {
    let result = sqlx::query(r#"DELETE FROM "Session" WHERE expires <= ?"#)
        .bind(Utc::now())
        .execute(executor)
        .await?;

    if result.rows_affected() > 0 {
        tracing::info!("Purged {} expired sessions", result.rows_affected());
    }

    Ok(result.rows_affected())
}
