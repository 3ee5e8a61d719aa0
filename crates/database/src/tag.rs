//! NFC tag operations.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, FromRow, Sqlite, SqliteExecutor};

use crate::error::{DatabaseError, Result};
use crate::file;
use crate::models::{NewTag, Tag, TagType, TagWithFiles};
use crate::query::{Field, GroupBy};

const TAG_COLUMNS: &str = "id, tagId, uid, name, type, kidooId, userId, createdAt, updatedAt";

/// Tag columns usable in group-by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagGroupField {
    Type,
    KidooId,
    UserId,
}

impl Field for TagGroupField {
    fn column_name(&self) -> &'static str {
        match self {
            TagGroupField::Type => "type",
            TagGroupField::KidooId => "kidooId",
            TagGroupField::UserId => "userId",
        }
    }
}

/// One group of a tag group-by. Fields not grouped on stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct TagGroup {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    #[sqlx(default)]
    pub tag_type: Option<TagType>,
    #[sqlx(default)]
    pub kidoo_id: Option<String>,
    #[sqlx(default)]
    pub user_id: Option<String>,
    #[serde(rename = "_count")]
    pub count: i64,
}

/// Create a new tag.
pub async fn create_tag<'e>(executor: impl SqliteExecutor<'e>, new: &NewTag) -> Result<Tag> {
    let id = new.id.clone().unwrap_or_else(crate::new_id);
    let now = Utc::now();
    let key = new.tag_id.clone().unwrap_or_else(|| id.clone());

    let tag = sqlx::query_as::<_, Tag>(&format!(
        r#"
        INSERT INTO "Tag" (id, tagId, uid, name, type, kidooId, userId, createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {TAG_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(&new.tag_id)
    .bind(&new.uid)
    .bind(&new.name)
    .bind(new.tag_type)
    .bind(&new.kidoo_id)
    .bind(&new.user_id)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "Tag", key))?;

    tracing::debug!(tag_id = %tag.id, kidoo_id = %tag.kidoo_id, "Created tag");
    Ok(tag)
}

/// Find a tag by ID.
pub async fn find_tag<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(&format!(
        r#"
        SELECT {TAG_COLUMNS}
        FROM "Tag"
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(tag)
}

/// Get a tag by ID, failing when it does not exist.
pub async fn get_tag<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Tag> {
    find_tag(executor, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Tag", id))
}

/// Find a tag by the identifier written on the chip.
pub async fn find_tag_by_tag_id<'e>(
    executor: impl SqliteExecutor<'e>,
    tag_id: &str,
) -> Result<Option<Tag>> {
    let tag = sqlx::query_as::<_, Tag>(&format!(
        r#"
        SELECT {TAG_COLUMNS}
        FROM "Tag"
        WHERE tagId = ?
        "#
    ))
    .bind(tag_id)
    .fetch_optional(executor)
    .await?;

    Ok(tag)
}

/// Get a tag by the identifier written on the chip, failing when it does not exist.
pub async fn get_tag_by_tag_id<'e>(executor: impl SqliteExecutor<'e>, tag_id: &str) -> Result<Tag> {
    find_tag_by_tag_id(executor, tag_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Tag", tag_id))
}

/// Get a tag with its enabled files in playback order.
pub async fn get_tag_with_files<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    tag_id: &str,
) -> Result<TagWithFiles> {
    let mut conn = conn.acquire().await?;
    let tag = get_tag_by_tag_id(&mut *conn, tag_id).await?;
    let multimedia_files = file::list_files_by_tag(&mut *conn, &tag.id, false).await?;
    Ok(TagWithFiles {
        tag,
        multimedia_files,
    })
}

/// Update a tag's editable fields.
pub async fn update_tag<'e>(executor: impl SqliteExecutor<'e>, tag: &Tag) -> Result<Tag> {
    let key = tag.tag_id.clone().unwrap_or_else(|| tag.id.clone());

    sqlx::query_as::<_, Tag>(&format!(
        r#"
        UPDATE "Tag"
        SET tagId = ?, uid = ?, name = ?, type = ?, kidooId = ?, userId = ?, updatedAt = ?
        WHERE id = ?
        RETURNING {TAG_COLUMNS}
        "#
    ))
    .bind(&tag.tag_id)
    .bind(&tag.uid)
    .bind(&tag.name)
    .bind(tag.tag_type)
    .bind(&tag.kidoo_id)
    .bind(&tag.user_id)
    .bind(Utc::now())
    .bind(&tag.id)
    .fetch_optional(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "Tag", key))?
    .ok_or_else(|| DatabaseError::not_found("Tag", tag.id.as_str()))
}

/// Delete a tag and its files.
pub async fn delete_tag<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM "Tag"
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Tag", id));
    }

    Ok(())
}

/// List the tags bound to a device.
pub async fn list_tags_by_kidoo<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(&format!(
        r#"
        SELECT {TAG_COLUMNS}
        FROM "Tag"
        WHERE kidooId = ?
        ORDER BY createdAt
        "#
    ))
    .bind(kidoo_id)
    .fetch_all(executor)
    .await?;

    Ok(tags)
}

/// List the tags owned by a user.
pub async fn list_tags_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(&format!(
        r#"
        SELECT {TAG_COLUMNS}
        FROM "Tag"
        WHERE userId = ?
        ORDER BY createdAt
        "#
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(tags)
}

/// Count total tags.
pub async fn count_tags<'e>(executor: impl SqliteExecutor<'e>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM "Tag"
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Count tags grouped by the requested columns.
pub async fn group_by<'e>(
    executor: impl SqliteExecutor<'e>,
    args: &GroupBy<TagGroupField>,
) -> Result<Vec<TagGroup>> {
    args.validate()?;

    let columns = args.select_columns();
    let order_by = args.order_by_sql();
    let groups = sqlx::query_as::<_, TagGroup>(&format!(
        r#"
        SELECT {columns}, COUNT(*) AS count
        FROM "Tag"
        GROUP BY {columns}
        {order_by}
        "#
    ))
    .fetch_all(executor)
    .await?;

    Ok(groups)
}
