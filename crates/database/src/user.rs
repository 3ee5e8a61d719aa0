//! User CRUD operations.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::{NewUser, User};
use crate::query::{Field, ListOptions, OrderBy};
use crate::validation::validate_email;

const USER_COLUMNS: &str = "id, email, emailVerified, name, avatar, password, createdAt, updatedAt";

/// Columns users can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortField {
    Email,
    Name,
    CreatedAt,
    UpdatedAt,
}

impl Field for UserSortField {
    fn column_name(&self) -> &'static str {
        match self {
            UserSortField::Email => "email",
            UserSortField::Name => "name",
            UserSortField::CreatedAt => "createdAt",
            UserSortField::UpdatedAt => "updatedAt",
        }
    }
}

/// Create a new user.
pub async fn create_user<'e>(executor: impl SqliteExecutor<'e>, new: &NewUser) -> Result<User> {
    validate_email(&new.email)?;

    let id = new.id.clone().unwrap_or_else(crate::new_id);
    let email = new.email.trim();
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO "User" (id, email, emailVerified, name, avatar, password, createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(email)
    .bind(new.email_verified)
    .bind(&new.name)
    .bind(&new.avatar)
    .bind(&new.password)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "User", email))?;

    tracing::debug!(user_id = %user.id, "Created user");
    Ok(user)
}

/// Find a user by ID.
pub async fn find_user<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM "User"
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

/// Get a user by ID, failing when it does not exist.
pub async fn get_user<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<User> {
    find_user(executor, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// Find a user by email.
pub async fn find_user_by_email<'e>(
    executor: impl SqliteExecutor<'e>,
    email: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM "User"
        WHERE email = ?
        "#
    ))
    .bind(email.trim())
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

/// Get a user by email, failing when it does not exist.
pub async fn get_user_by_email<'e>(executor: impl SqliteExecutor<'e>, email: &str) -> Result<User> {
    find_user_by_email(executor, email)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", email))
}

/// Update an existing user's profile fields and bump `updatedAt`.
pub async fn update_user<'e>(executor: impl SqliteExecutor<'e>, user: &User) -> Result<User> {
    validate_email(&user.email)?;

    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE "User"
        SET email = ?, emailVerified = ?, name = ?, avatar = ?, password = ?, updatedAt = ?
        WHERE id = ?
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.email.trim())
    .bind(user.email_verified)
    .bind(&user.name)
    .bind(&user.avatar)
    .bind(&user.password)
    .bind(Utc::now())
    .bind(&user.id)
    .fetch_optional(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "User", user.email.as_str()))?
    .ok_or_else(|| DatabaseError::not_found("User", user.id.as_str()))
}

/// Record that the user's email address has been verified.
pub async fn mark_email_verified<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE "User"
        SET emailVerified = ?, updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Delete a user by ID.
///
/// Accounts, sessions, tags and files of the user are deleted with it; owned
/// devices are kept and become unowned.
pub async fn delete_user<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM "User"
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    tracing::info!(user_id = %id, "Deleted user");
    Ok(())
}

/// List users.
pub async fn list_users<'e>(
    executor: impl SqliteExecutor<'e>,
    options: &ListOptions<UserSortField>,
) -> Result<Vec<User>> {
    let tail = options.to_sql(OrderBy::asc(UserSortField::Email))?;
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM "User"
        {tail}
        "#
    ))
    .fetch_all(executor)
    .await?;

    Ok(users)
}

/// Count total users.
pub async fn count_users<'e>(executor: impl SqliteExecutor<'e>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM "User"
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortOrder, MAX_PAGE_SIZE};
    use crate::test_support::*;

    #[tokio::test]
    async fn test_user_crud() {
        let db = test_db().await;

        // Create
        let user = create_user(
            db.pool(),
            &NewUser {
                email: "alice@example.com".to_string(),
                name: Some("Alice".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(user.email_verified.is_none());

        // Read
        let fetched = get_user(db.pool(), &user.id).await.unwrap();
        assert_eq!(fetched.name.as_deref(), Some("Alice"));
        let by_email = get_user_by_email(db.pool(), "alice@example.com").await.unwrap();
        assert_eq!(by_email.id, user.id);

        // Update
        let updated = update_user(
            db.pool(),
            &User {
                avatar: Some("https://cdn.example.com/alice.png".to_string()),
                ..fetched
            },
        )
        .await
        .unwrap();
        assert_eq!(
            updated.avatar.as_deref(),
            Some("https://cdn.example.com/alice.png")
        );
        assert!(updated.updated_at >= user.updated_at);

        // List
        let users = list_users(db.pool(), &ListOptions::default()).await.unwrap();
        assert_eq!(users.len(), 1);

        // Delete
        delete_user(db.pool(), &user.id).await.unwrap();
        let result = get_user(db.pool(), &user.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
        assert!(find_user(db.pool(), &user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = test_db().await;
        seed_user(&db, "a@x.com").await;

        let result = create_user(
            db.pool(),
            &NewUser {
                email: "a@x.com".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
        assert_eq!(count_users(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = test_db().await;
        let result = create_user(
            db.pool(),
            &NewUser {
                email: "not-an-email".to_string(),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mark_email_verified() {
        let db = test_db().await;
        let user = seed_user(&db, "a@x.com").await;

        mark_email_verified(db.pool(), &user.id).await.unwrap();
        let user = get_user(db.pool(), &user.id).await.unwrap();
        assert!(user.email_verified.is_some());

        assert!(mark_email_verified(db.pool(), "missing")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_list_users_sorted_and_paged() {
        let db = test_db().await;
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            seed_user(&db, email).await;
        }

        let options = ListOptions::default()
            .order_by(OrderBy {
                field: UserSortField::Email,
                order: SortOrder::Desc,
            })
            .skip(1)
            .take(1);
        let users = list_users(db.pool(), &options).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "b@x.com");
    }

    #[tokio::test]
    async fn test_list_users_returns_every_row_without_take() {
        let db = test_db().await;
        for i in 0..=MAX_PAGE_SIZE {
            seed_user(&db, &format!("user{i:04}@x.com")).await;
        }
        let total = count_users(db.pool()).await.unwrap();
        assert_eq!(total, MAX_PAGE_SIZE + 1);

        let all = list_users(db.pool(), &ListOptions::default()).await.unwrap();
        assert_eq!(all.len() as i64, total);

        // An explicit page is still clamped.
        let page = list_users(db.pool(), &ListOptions::default().take(10_000))
            .await
            .unwrap();
        assert_eq!(page.len() as i64, MAX_PAGE_SIZE);

        let rest = list_users(db.pool(), &ListOptions::default().skip(MAX_PAGE_SIZE))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].email, "user0500@x.com");
    }
}
