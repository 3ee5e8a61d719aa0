//! Bedtime and wake-up schedules of a dream config.
//!
//! The two schedule tables have the same shape, so every operation takes a
//! [`ScheduleKind`] selecting the table.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Sqlite, SqliteExecutor};

use crate::error::{DatabaseError, Result};
use crate::models::{DreamSchedule, ScheduleEntry};
use crate::validation::{validate_required, validate_time_of_day};

const SCHEDULE_COLUMNS: &str =
    "id, kidooConfigDreamId, weekday, hour, minute, activated, createdAt, updatedAt";

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// Week position of a weekday, matched on its first three letters. Unknown
/// names sort after Sunday.
const WEEKDAY_ORDER: &str = r#"CASE upper(substr(weekday, 1, 3))
            WHEN 'MON' THEN 0 WHEN 'TUE' THEN 1 WHEN 'WED' THEN 2 WHEN 'THU' THEN 3
            WHEN 'FRI' THEN 4 WHEN 'SAT' THEN 5 WHEN 'SUN' THEN 6 ELSE 7 END"#;

fn weekday_index(weekday: &str) -> usize {
    let prefix: String = weekday.chars().take(3).collect::<String>().to_uppercase();
    WEEKDAYS
        .iter()
        .position(|d| *d == prefix)
        .unwrap_or(WEEKDAYS.len())
}

/// Which schedule table to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Bedtime,
    Wakeup,
}

impl ScheduleKind {
    fn table(&self) -> &'static str {
        match self {
            ScheduleKind::Bedtime => "\"KidooConfigDreamBedtimeSchedule\"",
            ScheduleKind::Wakeup => "\"KidooConfigDreamWakeupSchedule\"",
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            ScheduleKind::Bedtime => "KidooConfigDreamBedtimeSchedule",
            ScheduleKind::Wakeup => "KidooConfigDreamWakeupSchedule",
        }
    }
}

fn validate_entry(entry: &ScheduleEntry) -> Result<()> {
    validate_required("weekday", &entry.weekday)?;
    validate_time_of_day(entry.hour, entry.minute)?;
    Ok(())
}

/// Add a schedule entry. Fails if the weekday already has one.
pub async fn create_schedule<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ScheduleKind,
    config_dream_id: &str,
    entry: &ScheduleEntry,
) -> Result<DreamSchedule> {
    validate_entry(entry)?;
    let now = Utc::now();

    let schedule = sqlx::query_as::<_, DreamSchedule>(&format!(
        r#"
        INSERT INTO {table} (id, kidooConfigDreamId, weekday, hour, minute, activated,
            createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {SCHEDULE_COLUMNS}
        "#,
        table = kind.table()
    ))
    .bind(crate::new_id())
    .bind(config_dream_id)
    .bind(&entry.weekday)
    .bind(entry.hour)
    .bind(entry.minute)
    .bind(entry.activated)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        DatabaseError::from_write(
            e,
            kind.entity(),
            format!("{}/{}", config_dream_id, entry.weekday),
        )
    })?;

    Ok(schedule)
}

/// Create or replace the entry for a weekday.
pub async fn upsert_schedule<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ScheduleKind,
    config_dream_id: &str,
    entry: &ScheduleEntry,
) -> Result<DreamSchedule> {
    validate_entry(entry)?;
    let now = Utc::now();

    let schedule = sqlx::query_as::<_, DreamSchedule>(&format!(
        r#"
        INSERT INTO {table} (id, kidooConfigDreamId, weekday, hour, minute, activated,
            createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(kidooConfigDreamId, weekday) DO UPDATE SET
            hour = excluded.hour,
            minute = excluded.minute,
            activated = excluded.activated,
            updatedAt = excluded.updatedAt
        RETURNING {SCHEDULE_COLUMNS}
        "#,
        table = kind.table()
    ))
    .bind(crate::new_id())
    .bind(config_dream_id)
    .bind(&entry.weekday)
    .bind(entry.hour)
    .bind(entry.minute)
    .bind(entry.activated)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, kind.entity(), config_dream_id))?;

    Ok(schedule)
}

/// List the entries of a dream config, Monday first.
pub async fn list_schedules<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ScheduleKind,
    config_dream_id: &str,
) -> Result<Vec<DreamSchedule>> {
    let rows = sqlx::query_as::<_, DreamSchedule>(&format!(
        r#"
        SELECT {SCHEDULE_COLUMNS}
        FROM {table}
        WHERE kidooConfigDreamId = ?
        ORDER BY {WEEKDAY_ORDER}, weekday
        "#,
        table = kind.table()
    ))
    .bind(config_dream_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Enable or disable the entry for a weekday.
pub async fn set_activated<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ScheduleKind,
    config_dream_id: &str,
    weekday: &str,
    activated: bool,
) -> Result<()> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE {table}
        SET activated = ?, updatedAt = ?
        WHERE kidooConfigDreamId = ? AND weekday = ?
        "#,
        table = kind.table()
    ))
    .bind(activated)
    .bind(Utc::now())
    .bind(config_dream_id)
    .bind(weekday)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found(
            kind.entity(),
            format!("{}/{}", config_dream_id, weekday),
        ));
    }

    Ok(())
}

/// Delete the entry for a weekday.
pub async fn delete_schedule<'e>(
    executor: impl SqliteExecutor<'e>,
    kind: ScheduleKind,
    config_dream_id: &str,
    weekday: &str,
) -> Result<()> {
    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table}
        WHERE kidooConfigDreamId = ? AND weekday = ?
        "#,
        table = kind.table()
    ))
    .bind(config_dream_id)
    .bind(weekday)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found(
            kind.entity(),
            format!("{}/{}", config_dream_id, weekday),
        ));
    }

    Ok(())
}

/// Replace all entries of a dream config in one transaction.
///
/// Either every entry is written or none is; a duplicate weekday in `entries`
/// rolls the whole replacement back.
pub async fn replace_schedules<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    kind: ScheduleKind,
    config_dream_id: &str,
    entries: &[ScheduleEntry],
) -> Result<Vec<DreamSchedule>> {
    for entry in entries {
        validate_entry(entry)?;
    }

    let mut tx = conn.begin().await?;

    sqlx::query(&format!(
        r#"
        DELETE FROM {table}
        WHERE kidooConfigDreamId = ?
        "#,
        table = kind.table()
    ))
    .bind(config_dream_id)
    .execute(&mut *tx)
    .await?;

    let now = Utc::now();
    let mut written = Vec::with_capacity(entries.len());
    for entry in entries {
        let schedule = sqlx::query_as::<_, DreamSchedule>(&format!(
            r#"
            INSERT INTO {table} (id, kidooConfigDreamId, weekday, hour, minute, activated,
                createdAt, updatedAt)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {SCHEDULE_COLUMNS}
            "#,
            table = kind.table()
        ))
        .bind(crate::new_id())
        .bind(config_dream_id)
        .bind(&entry.weekday)
        .bind(entry.hour)
        .bind(entry.minute)
        .bind(entry.activated)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            DatabaseError::from_write(
                e,
                kind.entity(),
                format!("{}/{}", config_dream_id, entry.weekday),
            )
        })?;
        written.push(schedule);
    }

    tx.commit().await?;

    tracing::debug!(
        config_dream_id = %config_dream_id,
        kind = ?kind,
        count = written.len(),
        "Replaced dream schedules"
    );
    written.sort_by(|a, b| {
        weekday_index(&a.weekday)
            .cmp(&weekday_index(&b.weekday))
            .then_with(|| a.weekday.cmp(&b.weekday))
    });
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kidoo_config_dream::create_config_dream;
    use crate::models::DreamSettings;
    use crate::test_support::*;

    async fn dream_id(db: &crate::Database) -> String {
        let kidoo = seed_kidoo(db, "dev-1", None).await;
        create_config_dream(db.pool(), &kidoo.id, &DreamSettings::default())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_one_entry_per_weekday() {
        let db = test_db().await;
        let dream = dream_id(&db).await;

        for kind in [ScheduleKind::Bedtime, ScheduleKind::Wakeup] {
            create_schedule(db.pool(), kind, &dream, &ScheduleEntry::new("MON", 21, 30))
                .await
                .unwrap();
            let result =
                create_schedule(db.pool(), kind, &dream, &ScheduleEntry::new("MON", 22, 0)).await;
            assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));
        }

        // Same weekday is fine across the two tables.
        assert_eq!(
            list_schedules(db.pool(), ScheduleKind::Bedtime, &dream)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            list_schedules(db.pool(), ScheduleKind::Wakeup, &dream)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_weekday() {
        let db = test_db().await;
        let dream = dream_id(&db).await;

        let first = upsert_schedule(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream,
            &ScheduleEntry::new("FRI", 20, 0),
        )
        .await
        .unwrap();
        let second = upsert_schedule(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream,
            &ScheduleEntry::new("FRI", 22, 15),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.hour, 22);
        assert_eq!(second.minute, 15);
    }

    #[tokio::test]
    async fn test_set_activated_and_delete() {
        let db = test_db().await;
        let dream = dream_id(&db).await;
        create_schedule(
            db.pool(),
            ScheduleKind::Wakeup,
            &dream,
            &ScheduleEntry::new("SUN", 9, 0),
        )
        .await
        .unwrap();

        set_activated(db.pool(), ScheduleKind::Wakeup, &dream, "SUN", false)
            .await
            .unwrap();
        let rows = list_schedules(db.pool(), ScheduleKind::Wakeup, &dream)
            .await
            .unwrap();
        assert!(!rows[0].activated);

        delete_schedule(db.pool(), ScheduleKind::Wakeup, &dream, "SUN")
            .await
            .unwrap();
        assert!(
            delete_schedule(db.pool(), ScheduleKind::Wakeup, &dream, "SUN")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_invalid_time_rejected() {
        let db = test_db().await;
        let dream = dream_id(&db).await;
        let result = create_schedule(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream,
            &ScheduleEntry::new("MON", 25, 0),
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::Validation(_))));
    }

    #[tokio::test]
    async fn test_replace_schedules_is_atomic() {
        let db = test_db().await;
        let dream = dream_id(&db).await;

        let written = replace_schedules(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream,
            &[
                ScheduleEntry::new("TUE", 20, 30),
                ScheduleEntry::new("MON", 20, 0),
            ],
        )
        .await
        .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].weekday, "MON");

        // Duplicate weekday: the whole replacement is rolled back.
        let result = replace_schedules(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream,
            &[
                ScheduleEntry::new("WED", 19, 0),
                ScheduleEntry::new("WED", 21, 0),
            ],
        )
        .await;
        assert!(matches!(result, Err(DatabaseError::AlreadyExists { .. })));

        let rows = list_schedules(db.pool(), ScheduleKind::Bedtime, &dream)
            .await
            .unwrap();
        let weekdays: Vec<&str> = rows.iter().map(|r| r.weekday.as_str()).collect();
        assert_eq!(weekdays, vec!["MON", "TUE"]);
    }

    #[tokio::test]
    async fn test_schedules_listed_in_week_order() {
        let db = test_db().await;
        let dream = dream_id(&db).await;

        let entries: Vec<ScheduleEntry> = ["SUN", "FRI", "MON", "WED", "SAT", "TUE", "THU"]
            .into_iter()
            .map(|day| ScheduleEntry::new(day, 20, 0))
            .collect();
        let written = replace_schedules(db.pool(), ScheduleKind::Wakeup, &dream, &entries)
            .await
            .unwrap();
        let weekdays: Vec<&str> = written.iter().map(|r| r.weekday.as_str()).collect();
        assert_eq!(weekdays, WEEKDAYS.to_vec());

        let rows = list_schedules(db.pool(), ScheduleKind::Wakeup, &dream)
            .await
            .unwrap();
        let weekdays: Vec<&str> = rows.iter().map(|r| r.weekday.as_str()).collect();
        assert_eq!(weekdays, WEEKDAYS.to_vec());
    }

    #[test]
    fn test_weekday_index() {
        assert_eq!(weekday_index("MON"), 0);
        assert_eq!(weekday_index("sunday"), 6);
        assert_eq!(weekday_index("???"), 7);
    }
}
