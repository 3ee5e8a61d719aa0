//! OAuth account links.

use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::{Account, NewAccount, User};
use crate::validation::validate_required;

const ACCOUNT_COLUMNS: &str = r#"id, userId, type, provider, providerAccountId, refresh_token,
    access_token, expires_at, token_type, scope, id_token, session_state"#;

/// Link a provider account to a user.
pub async fn link_account<'e>(
    executor: impl SqliteExecutor<'e>,
    new: &NewAccount,
) -> Result<Account> {
    validate_required("provider", &new.provider)?;
    validate_required("providerAccountId", &new.provider_account_id)?;

    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        INSERT INTO "Account" (id, userId, type, provider, providerAccountId, refresh_token,
            access_token, expires_at, token_type, scope, id_token, session_state)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    ))
    .bind(crate::new_id())
    .bind(&new.user_id)
    .bind(&new.account_type)
    .bind(&new.provider)
    .bind(&new.provider_account_id)
    .bind(&new.refresh_token)
    .bind(&new.access_token)
    .bind(new.expires_at)
    .bind(&new.token_type)
    .bind(&new.scope)
    .bind(&new.id_token)
    .bind(&new.session_state)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        DatabaseError::from_write(
            e,
            "Account",
            format!("{}/{}", new.provider, new.provider_account_id),
        )
    })?;

    tracing::debug!(user_id = %account.user_id, provider = %account.provider, "Linked account");
    Ok(account)
}

/// Find an account by ID.
pub async fn find_account<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
) -> Result<Option<Account>> {
    let account = sqlx::query_as::<_, Account>(&format!(
        r#"
        SELECT {ACCOUNT_COLUMNS}
        FROM "Account"
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(account)
}

/// Get an account by its provider identity.
pub async fn get_account_by_provider<'e>(
    executor: impl SqliteExecutor<'e>,
    provider: &str,
    provider_account_id: &str,
) -> Result<Account> {
    sqlx::query_as::<_, Account>(&format!(
        r#"
        SELECT {ACCOUNT_COLUMNS}
        FROM "Account"
        WHERE provider = ? AND providerAccountId = ?
        "#
    ))
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| {
        DatabaseError::not_found("Account", format!("{}/{}", provider, provider_account_id))
    })
}

/// Resolve the user behind a provider identity, if the account is linked.
pub async fn get_user_by_account<'e>(
    executor: impl SqliteExecutor<'e>,
    provider: &str,
    provider_account_id: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.emailVerified, u.name, u.avatar, u.password, u.createdAt, u.updatedAt
        FROM "User" u
        INNER JOIN "Account" a ON a.userId = u.id
        WHERE a.provider = ? AND a.providerAccountId = ?
        "#,
    )
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

/// List the accounts linked to a user.
pub async fn list_accounts_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
) -> Result<Vec<Account>> {
    let accounts = sqlx::query_as::<_, Account>(&format!(
        r#"
        SELECT {ACCOUNT_COLUMNS}
        FROM "Account"
        WHERE userId = ?
        ORDER BY provider
        "#
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(accounts)
}

/// Remove a provider link.
pub async fn unlink_account<'e>(
    executor: impl SqliteExecutor<'e>,
    provider: &str,
    provider_account_id: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM "Account"
        WHERE provider = ? AND providerAccountId = ?
        "#,
    )
    .bind(provider)
    .bind(provider_account_id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found(
            "Account",
            format!("{}/{}", provider, provider_account_id),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn google(user_id: &str, provider_account_id: &str) -> NewAccount {
        NewAccount {
            user_id: user_id.to_string(),
            account_type: "oauth".to_string(),
            provider: "google".to_string(),
            provider_account_id: provider_account_id.to_string(),
            access_token: Some("ya29.token".to_string()),
            expires_at: Some(1_900_000_000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_link_and_resolve() {
        let db = test_db().await;
        let user = seed_user(&db, "a@x.com").await;

        let account = link_account(db.pool(), &google(&user.id, "g-1")).await.unwrap();
        assert_eq!(account.expires_at, Some(1_900_000_000));
        assert_eq!(
            find_account(db.pool(), &account.id).await.unwrap(),
            Some(account.clone())
        );

        let resolved = get_user_by_account(db.pool(), "google", "g-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(get_user_by_account(db.pool(), "github", "g-1")
            .await
            .unwrap()
            .is_none());

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["providerAccountId"], "g-1");
        assert_eq!(json["access_token"], "ya29.token");
        assert_eq!(json["type"], "oauth");
    }

    #[tokio::test]
    async fn test_provider_identity_unique() {
        let db = test_db().await;
        let alice = seed_user(&db, "alice@x.com").await;
        let bob = seed_user(&db, "bob@x.com").await;

        link_account(db.pool(), &google(&alice.id, "g-1")).await.unwrap();
        let result = link_account(db.pool(), &google(&bob.id, "g-1")).await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        // Same provider, different identity is fine.
        link_account(db.pool(), &google(&bob.id, "g-2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unlink() {
        let db = test_db().await;
        let user = seed_user(&db, "a@x.com").await;
        link_account(db.pool(), &google(&user.id, "g-1")).await.unwrap();

        unlink_account(db.pool(), "google", "g-1").await.unwrap();
        assert!(list_accounts_by_user(db.pool(), &user.id)
            .await
            .unwrap()
            .is_empty());
        assert!(get_account_by_provider(db.pool(), "google", "g-1")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(unlink_account(db.pool(), "google", "g-1").await.is_err());
    }
}
