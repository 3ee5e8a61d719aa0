//! Device storage telemetry.

use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::error::{DatabaseError, Result};
use crate::models::{KidooConfigBasic, StorageReport};
use crate::validation::ValidationError;

const CONFIG_BASIC_COLUMNS: &str = r#"id, kidooId, storageTotalBytes, storageFreeBytes,
    storageUsedBytes, storageFreePercent, storageUsedPercent, storageLastUpdated, createdAt,
    updatedAt"#;

/// Fill in used bytes and both percentages from a raw report.
///
/// Returns `(used_bytes, free_percent, used_percent)`.
pub fn derive_storage(
    report: &StorageReport,
) -> std::result::Result<(Option<i64>, Option<i32>, Option<i32>), ValidationError> {
    for (field, value) in [
        ("storageTotalBytes", report.total_bytes),
        ("storageFreeBytes", report.free_bytes),
        ("storageUsedBytes", report.used_bytes),
    ] {
        if let Some(v) = value {
            if v < 0 {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0,
                    max: i64::MAX,
                    actual: v,
                });
            }
        }
    }

    let used = match (report.used_bytes, report.total_bytes, report.free_bytes) {
        (Some(used), _, _) => Some(used),
        (None, Some(total), Some(free)) => Some(total.saturating_sub(free).max(0)),
        _ => None,
    };

    let (free_percent, used_percent) = match (report.total_bytes, report.free_bytes) {
        (Some(total), Some(free)) if total > 0 => {
            let free_percent = ((free.min(total) as f64 / total as f64) * 100.0).round() as i32;
            (Some(free_percent), Some(100 - free_percent))
        }
        _ => (None, None),
    };

    Ok((used, free_percent, used_percent))
}

/// Find the basic config of a device.
pub async fn find_config_basic<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<Option<KidooConfigBasic>> {
    let record = sqlx::query_as::<_, KidooConfigBasic>(&format!(
        r#"
        SELECT {CONFIG_BASIC_COLUMNS}
        FROM "KidooConfigBasic"
        WHERE kidooId = ?
        "#
    ))
    .bind(kidoo_id)
    .fetch_optional(executor)
    .await?;

    Ok(record)
}

/// Get the basic config of a device, failing when it has none.
pub async fn get_config_basic<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<KidooConfigBasic> {
    find_config_basic(executor, kidoo_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("KidooConfigBasic", kidoo_id))
}

/// Store the latest storage report of a device.
///
/// Creates the config on first report and stamps `storageLastUpdated`.
pub async fn upsert_storage<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
    report: &StorageReport,
) -> Result<KidooConfigBasic> {
    let (used, free_percent, used_percent) = derive_storage(report)?;
    let now = Utc::now();

    let record = sqlx::query_as::<_, KidooConfigBasic>(&format!(
        r#"
        INSERT INTO "KidooConfigBasic" (id, kidooId, storageTotalBytes, storageFreeBytes,
            storageUsedBytes, storageFreePercent, storageUsedPercent, storageLastUpdated,
            createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(kidooId) DO UPDATE SET
            storageTotalBytes = excluded.storageTotalBytes,
            storageFreeBytes = excluded.storageFreeBytes,
            storageUsedBytes = excluded.storageUsedBytes,
            storageFreePercent = excluded.storageFreePercent,
            storageUsedPercent = excluded.storageUsedPercent,
            storageLastUpdated = excluded.storageLastUpdated,
            updatedAt = excluded.updatedAt
        RETURNING {CONFIG_BASIC_COLUMNS}
        "#
    ))
    .bind(crate::new_id())
    .bind(kidoo_id)
    .bind(report.total_bytes)
    .bind(report.free_bytes)
    .bind(used)
    .bind(free_percent)
    .bind(used_percent)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "KidooConfigBasic", kidoo_id))?;

    tracing::debug!(kidoo_id = %kidoo_id, free_percent = ?free_percent, "Stored storage report");
    Ok(record)
}

/// Delete the basic config of a device.
///
/// Returns true if a config was deleted, false if none existed.
pub async fn delete_config_basic<'e>(
    executor: impl SqliteExecutor<'e>,
    kidoo_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM "KidooConfigBasic"
        WHERE kidooId = ?
        "#,
    )
    .bind(kidoo_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    const GIB: i64 = 1024 * 1024 * 1024;

    #[test]
    fn test_derive_storage() {
        let (used, free_pct, used_pct) = derive_storage(&StorageReport {
            total_bytes: Some(4 * GIB),
            free_bytes: Some(GIB),
            used_bytes: None,
        })
        .unwrap();
        assert_eq!(used, Some(3 * GIB));
        assert_eq!(free_pct, Some(25));
        assert_eq!(used_pct, Some(75));

        // Nothing to derive from a partial report.
        let (used, free_pct, _) = derive_storage(&StorageReport {
            total_bytes: Some(GIB),
            ..Default::default()
        })
        .unwrap();
        assert!(used.is_none());
        assert!(free_pct.is_none());

        assert!(derive_storage(&StorageReport {
            free_bytes: Some(-1),
            ..Default::default()
        })
        .is_err());
    }

    #[tokio::test]
    async fn test_upsert_storage() {
        let db = test_db().await;
        let kidoo = seed_kidoo(&db, "dev-1", None).await;

        assert!(find_config_basic(db.pool(), &kidoo.id).await.unwrap().is_none());

        let first = upsert_storage(
            db.pool(),
            &kidoo.id,
            &StorageReport {
                total_bytes: Some(8 * GIB),
                free_bytes: Some(6 * GIB),
                used_bytes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(first.storage_used_bytes, Some(2 * GIB));
        assert!(first.storage_last_updated.is_some());

        let second = upsert_storage(
            db.pool(),
            &kidoo.id,
            &StorageReport {
                total_bytes: Some(8 * GIB),
                free_bytes: Some(2 * GIB),
                used_bytes: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.storage_used_percent, Some(75));

        let stored = get_config_basic(db.pool(), &kidoo.id).await.unwrap();
        assert_eq!(stored.storage_free_bytes, Some(2 * GIB));
    }

    #[tokio::test]
    async fn test_storage_for_unknown_kidoo() {
        let db = test_db().await;
        let result = upsert_storage(db.pool(), "missing", &StorageReport::default()).await;
        assert!(matches!(result, Err(DatabaseError::ForeignKey { .. })));
        assert!(!delete_config_basic(db.pool(), "missing").await.unwrap());
    }
}
