//! Dream (night light) configuration.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::{DreamSettings, KidooConfigDream};
use crate::validation::{validate_brightness, validate_color};

const CONFIG_DREAM_COLUMNS: &str = r#"id, kidooId, colorR, colorG, colorB, brightness, allNight,
    effect, wakeupColorR, wakeupColorG, wakeupColorB, wakeupBrightness, createdAt, updatedAt"#;

fn validate_settings(settings: &DreamSettings) -> Result<()> {
    validate_color("colorR", settings.color_r)?;
    validate_color("colorG", settings.color_g)?;
    validate_color("colorB", settings.color_b)?;
    validate_brightness("brightness", settings.brightness)?;
    validate_color("wakeupColorR", settings.wakeup_color_r)?;
    validate_color("wakeupColorG", settings.wakeup_color_g)?;
    validate_color("wakeupColorB", settings.wakeup_color_b)?;
    validate_brightness("wakeupBrightness", settings.wakeup_brightness)?;
    Ok(())
}

/// Create the dream config of a device.
///
/// A device has at most one dream config; a second create fails with
/// `AlreadyExists`.
pub async fn create_config_dream<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
    settings: &DreamSettings,
) -> Result<KidooConfigDream> {
    validate_settings(settings)?;
    let now = Utc::now();

    let record = sqlx::query_as::<_, KidooConfigDream>(&format!(
        r#"
        INSERT INTO "KidooConfigDream" (id, kidooId, colorR, colorG, colorB, brightness, allNight,
            effect, wakeupColorR, wakeupColorG, wakeupColorB, wakeupBrightness, createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {CONFIG_DREAM_COLUMNS}
        "#
    ))
    .bind(crate::new_id())
    .bind(kidoo_id)
    .bind(settings.color_r)
    .bind(settings.color_g)
    .bind(settings.color_b)
    .bind(settings.brightness)
    .bind(settings.all_night)
    .bind(&settings.effect)
    .bind(settings.wakeup_color_r)
    .bind(settings.wakeup_color_g)
    .bind(settings.wakeup_color_b)
    .bind(settings.wakeup_brightness)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "KidooConfigDream", kidoo_id))?;

    Ok(record)
}

/// Find the dream config of a device.
pub async fn find_config_dream<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<Option<KidooConfigDream>> {
    let record = sqlx::query_as::<_, KidooConfigDream>(&format!(
        r#"
        SELECT {CONFIG_DREAM_COLUMNS}
        FROM "KidooConfigDream"
        WHERE kidooId = ?
        "#
    ))
    .bind(kidoo_id)
    .fetch_optional(executor)
    .await?;

    Ok(record)
}

/// Get the dream config of a device, failing when it has none.
pub async fn get_config_dream<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<KidooConfigDream> {
    find_config_dream(executor, kidoo_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("KidooConfigDream", kidoo_id))
}

/// Replace the dream settings of a device.
pub async fn update_config_dream<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
    settings: &DreamSettings,
) -> Result<KidooConfigDream> {
    validate_settings(settings)?;

    sqlx::query_as::<_, KidooConfigDream>(&format!(
        r#"
        UPDATE "KidooConfigDream"
        SET colorR = ?, colorG = ?, colorB = ?, brightness = ?, allNight = ?, effect = ?,
            wakeupColorR = ?, wakeupColorG = ?, wakeupColorB = ?, wakeupBrightness = ?,
            updatedAt = ?
        WHERE kidooId = ?
        RETURNING {CONFIG_DREAM_COLUMNS}
        "#
    ))
    .bind(settings.color_r)
    .bind(settings.color_g)
    .bind(settings.color_b)
    .bind(settings.brightness)
    .bind(settings.all_night)
    .bind(&settings.effect)
    .bind(settings.wakeup_color_r)
    .bind(settings.wakeup_color_g)
    .bind(settings.wakeup_color_b)
    .bind(settings.wakeup_brightness)
    .bind(Utc::now())
    .bind(kidoo_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| DatabaseError::not_found("KidooConfigDream", kidoo_id))
}

/// Delete the dream config of a device together with its schedules.
///
/// Returns true if a config was deleted, false if none existed.
pub async fn delete_config_dream<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM "KidooConfigDream"
        WHERE kidooId = ?
        "#,
    )
    .bind(kidoo_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
