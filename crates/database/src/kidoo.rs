//! Kidoo device operations.

use chrono::Utc;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Acquire, Sqlite, SqliteExecutor};

use crate::dream_schedule::{self, ScheduleKind};
use crate::error::{DatabaseError, Result};
use crate::models::{
    DreamConfigWithSchedules, Kidoo, KidooDetails, NewKidoo, DEFAULT_BRIGHTNESS,
    DEFAULT_SLEEP_TIMEOUT,
};
use crate::query::{aggregate_select, Aggregate, Field, ListOptions, OrderBy};
use crate::validation::{
    validate_brightness, validate_color, validate_device_id, validate_required,
};
use crate::{kidoo_config_basic, kidoo_config_dream};

const KIDOO_COLUMNS: &str = r#"id, name, model, macAddress, bluetoothMacAddress, deviceId,
    firmwareVersion, lastConnected, isConnected, wifiSSID, isSynced, brightness, sleepTimeout,
    sleepColorR, sleepColorG, sleepColorB, sleepEffect, userId, createdAt, updatedAt"#;

/// Columns devices can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KidooSortField {
    Name,
    Model,
    DeviceId,
    LastConnected,
    CreatedAt,
}

impl Field for KidooSortField {
    fn column_name(&self) -> &'static str {
        match self {
            KidooSortField::Name => "name",
            KidooSortField::Model => "model",
            KidooSortField::DeviceId => "deviceId",
            KidooSortField::LastConnected => "lastConnected",
            KidooSortField::CreatedAt => "createdAt",
        }
    }
}

/// Numeric device columns that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KidooNumericField {
    Brightness,
    SleepTimeout,
    SleepColorR,
    SleepColorG,
    SleepColorB,
    SleepEffect,
}

impl Field for KidooNumericField {
    fn column_name(&self) -> &'static str {
        match self {
            KidooNumericField::Brightness => "brightness",
            KidooNumericField::SleepTimeout => "sleepTimeout",
            KidooNumericField::SleepColorR => "sleepColorR",
            KidooNumericField::SleepColorG => "sleepColorG",
            KidooNumericField::SleepColorB => "sleepColorB",
            KidooNumericField::SleepEffect => "sleepEffect",
        }
    }
}

fn validate_settings(kidoo: &Kidoo) -> Result<()> {
    validate_required("name", &kidoo.name)?;
    validate_required("model", &kidoo.model)?;
    validate_device_id(&kidoo.device_id)?;
    validate_brightness("brightness", Some(kidoo.brightness))?;
    validate_color("sleepColorR", kidoo.sleep_color_r)?;
    validate_color("sleepColorG", kidoo.sleep_color_g)?;
    validate_color("sleepColorB", kidoo.sleep_color_b)?;
    Ok(())
}

/// Register a new device.
pub async fn create_kidoo<'e>(executor: impl SqliteExecutor<'e>, new: &NewKidoo) -> Result<Kidoo> {
    validate_required("name", &new.name)?;
    validate_required("model", &new.model)?;
    validate_device_id(&new.device_id)?;
    validate_brightness("brightness", new.brightness)?;

    let id = new.id.clone().unwrap_or_else(crate::new_id);
    let now = Utc::now();

    let kidoo = sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        INSERT INTO "Kidoo" (id, name, model, macAddress, bluetoothMacAddress, deviceId,
            firmwareVersion, wifiSSID, brightness, sleepTimeout, userId, createdAt, updatedAt)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {KIDOO_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(&new.name)
    .bind(&new.model)
    .bind(&new.mac_address)
    .bind(&new.bluetooth_mac_address)
    .bind(&new.device_id)
    .bind(&new.firmware_version)
    .bind(&new.wifi_ssid)
    .bind(new.brightness.unwrap_or(DEFAULT_BRIGHTNESS))
    .bind(new.sleep_timeout.unwrap_or(DEFAULT_SLEEP_TIMEOUT))
    .bind(&new.user_id)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "Kidoo", new.device_id.as_str()))?;

    tracing::debug!(kidoo_id = %kidoo.id, device_id = %kidoo.device_id, "Registered kidoo");
    Ok(kidoo)
}

/// Find a device by ID.
pub async fn find_kidoo<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Option<Kidoo>> {
    let kidoo = sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        SELECT {KIDOO_COLUMNS}
        FROM "Kidoo"
        WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(kidoo)
}

/// Get a device by ID, failing when it does not exist.
pub async fn get_kidoo<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<Kidoo> {
    find_kidoo(executor, id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Kidoo", id))
}

/// Find a device by its hardware identifier.
pub async fn find_kidoo_by_device_id<'e>(
    executor: impl SqliteExecutor<'e>,
    device_id: &str,
) -> Result<Option<Kidoo>> {
    let kidoo = sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        SELECT {KIDOO_COLUMNS}
        FROM "Kidoo"
        WHERE deviceId = ?
        "#
    ))
    .bind(device_id)
    .fetch_optional(executor)
    .await?;

    Ok(kidoo)
}

/// Get a device by its hardware identifier, failing when it does not exist.
pub async fn get_kidoo_by_device_id<'e>(
    executor: impl SqliteExecutor<'e>,
    device_id: &str,
) -> Result<Kidoo> {
    find_kidoo_by_device_id(executor, device_id)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Kidoo", device_id))
}

/// Write every editable column of a device and bump `updatedAt`.
pub async fn update_kidoo<'e>(executor: impl SqliteExecutor<'e>, kidoo: &Kidoo) -> Result<Kidoo> {
    validate_settings(kidoo)?;

    sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        UPDATE "Kidoo"
        SET name = ?, model = ?, macAddress = ?, bluetoothMacAddress = ?, deviceId = ?,
            firmwareVersion = ?, lastConnected = ?, isConnected = ?, wifiSSID = ?, isSynced = ?,
            brightness = ?, sleepTimeout = ?, sleepColorR = ?, sleepColorG = ?, sleepColorB = ?,
            sleepEffect = ?, userId = ?, updatedAt = ?
        WHERE id = ?
        RETURNING {KIDOO_COLUMNS}
        "#
    ))
    .bind(&kidoo.name)
    .bind(&kidoo.model)
    .bind(&kidoo.mac_address)
    .bind(&kidoo.bluetooth_mac_address)
    .bind(&kidoo.device_id)
    .bind(&kidoo.firmware_version)
    .bind(kidoo.last_connected)
    .bind(kidoo.is_connected)
    .bind(&kidoo.wifi_ssid)
    .bind(kidoo.is_synced)
    .bind(kidoo.brightness)
    .bind(kidoo.sleep_timeout)
    .bind(kidoo.sleep_color_r)
    .bind(kidoo.sleep_color_g)
    .bind(kidoo.sleep_color_b)
    .bind(kidoo.sleep_effect)
    .bind(&kidoo.user_id)
    .bind(Utc::now())
    .bind(&kidoo.id)
    .fetch_optional(executor)
    .await
    .map_err(|e| DatabaseError::from_write(e, "Kidoo", kidoo.device_id.as_str()))?
    .ok_or_else(|| DatabaseError::not_found("Kidoo", kidoo.id.as_str()))
}

async fn execute_update<'e, 'q>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
) -> Result<()> {
    let result = query
        .execute(executor)
        .await
        .map_err(|e| DatabaseError::from_write(e, "Kidoo", id))?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Kidoo", id));
    }

    Ok(())
}

/// Claim a device for a user, or release it with `None`.
pub async fn assign_owner<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    user_id: Option<&str>,
) -> Result<()> {
    let query = sqlx::query(
        r#"
        UPDATE "Kidoo"
        SET userId = ?, updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .bind(id);

    execute_update(executor, id, query).await?;
    tracing::info!(kidoo_id = %id, user_id = ?user_id, "Assigned kidoo owner");
    Ok(())
}

/// Record a device connection, optionally updating its firmware version.
pub async fn mark_connected<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    firmware_version: Option<&str>,
) -> Result<()> {
    let now = Utc::now();
    let query = sqlx::query(
        r#"
        UPDATE "Kidoo"
        SET isConnected = 1, lastConnected = ?,
            firmwareVersion = COALESCE(?, firmwareVersion), updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(firmware_version)
    .bind(now)
    .bind(id);

    execute_update(executor, id, query).await
}

/// Record that a device went offline.
pub async fn mark_disconnected<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let query = sqlx::query(
        r#"
        UPDATE "Kidoo"
        SET isConnected = 0, updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(id);

    execute_update(executor, id, query).await
}

/// Flag whether the device holds the latest tag and file data.
pub async fn set_synced<'e>(
    executor: impl SqliteExecutor<'e>,
    id: &str,
    synced: bool,
) -> Result<()> {
    let query = sqlx::query(
        r#"
        UPDATE "Kidoo"
        SET isSynced = ?, updatedAt = ?
        WHERE id = ?
        "#,
    )
    .bind(synced)
    .bind(Utc::now())
    .bind(id);

    execute_update(executor, id, query).await
}

/// Delete a device along with its tags, files and configuration.
pub async fn delete_kidoo<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM "Kidoo"
        WHERE id = ?
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Kidoo", id));
    }

    tracing::info!(kidoo_id = %id, "Deleted kidoo");
    Ok(())
}

/// List all devices.
pub async fn list_kidoos<'e>(
    executor: impl SqliteExecutor<'e>,
    options: &ListOptions<KidooSortField>,
) -> Result<Vec<Kidoo>> {
    let tail = options.to_sql(OrderBy::asc(KidooSortField::Name))?;
    let kidoos = sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        SELECT {KIDOO_COLUMNS}
        FROM "Kidoo"
        {tail}
        "#
    ))
    .fetch_all(executor)
    .await?;

    Ok(kidoos)
}

/// List the devices owned by a user.
pub async fn list_kidoos_by_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: &str,
) -> Result<Vec<Kidoo>> {
    let kidoos = sqlx::query_as::<_, Kidoo>(&format!(
        r#"
        SELECT {KIDOO_COLUMNS}
        FROM "Kidoo"
        WHERE userId = ?
        ORDER BY name
        "#
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(kidoos)
}

/// Count total devices.
pub async fn count_kidoos<'e>(executor: impl SqliteExecutor<'e>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM "Kidoo"
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Count devices currently online.
pub async fn count_connected_kidoos<'e>(executor: impl SqliteExecutor<'e>) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM "Kidoo" WHERE isConnected = 1
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(count)
}

/// Aggregate a numeric device column over all devices.
pub async fn aggregate<'e>(
    executor: impl SqliteExecutor<'e>,
    field: KidooNumericField,
) -> Result<Aggregate> {
    let select = aggregate_select(field.column_name());
    let aggregate = sqlx::query_as::<_, Aggregate>(&format!(
        r#"
        {select}
        FROM "Kidoo"
        "#
    ))
    .fetch_one(executor)
    .await?;

    Ok(aggregate)
}

/// Load a device with its basic config, dream config and schedules.
pub async fn get_kidoo_details<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    id: &str,
) -> Result<KidooDetails> {
    let mut conn = conn.acquire().await?;
    let kidoo = get_kidoo(&mut *conn, id).await?;
    let config_basic = kidoo_config_basic::find_config_basic(&mut *conn, id).await?;

    let config_dream = match kidoo_config_dream::find_config_dream(&mut *conn, id).await? {
        Some(config) => {
            let bedtime_schedules =
                dream_schedule::list_schedules(&mut *conn, ScheduleKind::Bedtime, &config.id)
                    .await?;
            let wakeup_schedules =
                dream_schedule::list_schedules(&mut *conn, ScheduleKind::Wakeup, &config.id)
                    .await?;
            Some(DreamConfigWithSchedules {
                config,
                bedtime_schedules,
                wakeup_schedules,
            })
        }
        None => None,
    };

    Ok(KidooDetails {
        kidoo,
        config_basic,
        config_dream,
    })
}
