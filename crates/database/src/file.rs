//! Media file operations.

use chrono::Utc;
use sqlx::{Acquire, Sqlite, SqliteExecutor};

use crate::error::{DatabaseError, Result};
use crate::models::{File, NewFile};
use crate::query::{aggregate_select, Aggregate, Field};
use crate::validation::{validate_range, validate_required};

const FILE_COLUMNS: &str = r#"id, url, path, fileName, originalName, size, mimeType, "order",
    disabled, tagId, userId, createdAt, updatedAt"#;

/// Numeric file columns that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileNumericField {
    Size,
    Order,
}

impl Field for FileNumericField {
    fn column_name(&self) -> &'static str {
        match self {
            FileNumericField::Size => "size",
            FileNumericField::Order => "\"order\"",
        }
    }
}

fn validate_new(new: &NewFile) -> Result<()> {
    validate_required("url", &new.url)?;
    validate_required("path", &new.path)?;
    validate_required("fileName", &new.file_name)?;
    validate_required("mimeType", &new.mime_type)?;
    validate_range("size", i64::from(new.size), 0, i64::from(i32::MAX))?;
    if let Some(order) = new.order {
        validate_range("order", i64::from(order), 0, i64::from(i32::MAX))?;
    }
    Ok(())
}

/// Attach a new file to a tag.
///
/// Without an explicit `order` the file is placed after the last file of the tag.
pub async fn create_file<'e>(executor: impl SqliteExecutor<'e>, new: &NewFile) -> Result<File> {
    validate_new(new)?;

    let id = new.id.clone().unwrap_or_else(crate::new_id);
    let now = Utc::now();

    let file = sqlx::query_as::<_, File>(&format!(
        r#"
        INSERT INTO "File" (id, url, path, fileName, originalName, size, mimeType, "order",
            disabled, tagId, userId, createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?,
            COALESCE(?, (SELECT COALESCE(MAX("order"), -1) + 1 FROM "File" WHERE tagId = ?)),
            ?, ?, ?, ?, ?)
        RETURNING {FILE_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(&new.url)
    .bind(&new.path)
    .bind(&new.file_name)
    .bind(&new.original_name)
    .bind(new.size)
    .bind(&new.mime_type)
    .bind(new.order)
    .bind(&new.tag_id)
    .bind(new.disabled)
    .bind(&new.tag_id)
    .bind(&new.user_id)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "File", id.as_str()))?;

    tracing::debug!(file_id = %file.id, tag_id = %file.tag_id, order = file.order, "Created file");
    Ok(file)
}

/// Find a file by ID.
pub async fn find_file<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Option<File>> {
    let file = sqlx::query_as::<_, File>(&format!(
        r#"
        SELECT {FILE_COLUMNS}
        FROM "File"
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(file)
}

/// Get a file by ID, failing when it does not exist.
pub async fn get_file<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<File> {
    find_file(executor, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("File", id))
}

/// Update a file's editable fields.
pub async fn update_file<'e>(executor: impl SqliteExecutor<'e>, file: &File) -> Result<File> {
    validate_required("fileName", &file.file_name)?;
    validate_range("order", i64::from(file.order), 0, i64::from(i32::MAX))?;

    sqlx::query_as::<_, File>(&format!(
        r#"
        UPDATE "File"
        SET url = ?, path = ?, fileName = ?, originalName = ?, size = ?, mimeType = ?,
            "order" = ?, disabled = ?, tagId = ?, updatedAt = ?
        WHERE id = ?
        RETURNING {FILE_COLUMNS}
        "#
    ))
    .bind(&file.url)
    .bind(&file.path)
    .bind(&file.file_name)
    .bind(&file.original_name)
    .bind(file.size)
    .bind(&file.mime_type)
    .bind(file.order)
    .bind(file.disabled)
    .bind(&file.tag_id)
    .bind(Utc::now())
    .bind(&file.id)
    .fetch_optional(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "File", file.id.as_str()))?
    .ok_or_else(|| DatabaseError::not_found("File", file.id.as_str()))
}

/// Enable or disable playback of a file.
pub async fn set_disabled<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    disabled: bool,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE "File"
        SET disabled = ?, updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(disabled)
    .bind(Utc::now())
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("File", id));
    }

    Ok(())
}

/// Delete a file by ID.
pub async fn delete_file<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM "File"
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("File", id));
    }

    Ok(())
}

/// List the files of a tag in playback order.
pub async fn list_files_by_tag<'e>(
    executor: impl SqliteExecutor<'e>,
    tag_id: &str,
    include_disabled: bool,
) -> Result<Vec<File>> {
    let files = sqlx::query_as::<_, File>(&format!(
        r#"
        SELECT {FILE_COLUMNS}
        FROM "File"
        WHERE tagId = ? AND (? OR disabled = 0)
        ORDER BY "order", createdAt
        "#
    ))
    .bind(tag_id)
    .bind(include_disabled)
    .fetch_all(executor)
    .await?;

    Ok(files)
}

/// Set the playback order of a tag's files to the order of `file_ids`.
///
/// Runs in one transaction; an id that does not belong to the tag aborts the
/// whole reorder.
pub async fn reorder_files<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    tag_id: &str,
    file_ids: &[String],
) -> Result<()> {
    let mut tx = conn.begin().await?;
    let now = Utc::now();

    for (position, file_id) in file_ids.iter().enumerate() {
        let result = sqlx::query(
            r#"
            UPDATE "File"
            SET "order" = ?, updatedAt = ?
            WHERE id = ? AND tagId = ?
            "#,
        )
        .bind(position as i64)
        .bind(now)
        .bind(file_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("File", file_id.as_str()));
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Count total files.
pub async fn count_files<'e>(executor: impl SqliteExecutor<'e>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM "File"
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Aggregate a numeric file column, optionally restricted to one tag.
pub async fn aggregate<'e>(
    executor: impl SqliteExecutor<'e>,
    field: FileNumericField,
    tag_id: Option<&str>,
) -> Result<Aggregate> {
    let select = aggregate_select(field.column_name());
    let aggregate = sqlx::query_as::<_, Aggregate>(&format!(
        r#"
        {select}
        FROM "File"
        WHERE ? IS NULL OR tagId = ?
        "#
    ))
    .bind(tag_id)
    .bind(tag_id)
    .fetch_one(executor)
    .await?;

    Ok(aggregate)
}
