//! Database models.
//!
//! Field names serialize (and map to columns) in camelCase, matching the
//! stored schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::ValidationError;

/// Media category of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TagType {
    Music,
    Story,
    Sound,
}

impl TagType {
    /// All tag types, in declaration order.
    pub const ALL: [TagType; 3] = [TagType::Music, TagType::Story, TagType::Sound];

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Music => "MUSIC",
            TagType::Story => "STORY",
            TagType::Sound => "SOUND",
        }
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidTagType(s.to_string()))
    }
}

/// An application user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Unique login email.
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    /// Password hash for credential logins.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Explicit id; generated when absent.
    pub id: Option<String>,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub password: Option<String>,
}

/// An OAuth account linked to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub user_id: String,
    /// Account type, e.g. "oauth" or "email".
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(rename = "refresh_token")]
    #[sqlx(rename = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(rename = "access_token")]
    #[sqlx(rename = "access_token")]
    pub access_token: Option<String>,
    /// Access token expiry, in seconds since the epoch.
    #[serde(rename = "expires_at")]
    #[sqlx(rename = "expires_at")]
    pub expires_at: Option<i64>,
    #[serde(rename = "token_type")]
    #[sqlx(rename = "token_type")]
    pub token_type: Option<String>,
    pub scope: Option<String>,
    #[serde(rename = "id_token")]
    #[sqlx(rename = "id_token")]
    pub id_token: Option<String>,
    #[serde(rename = "session_state")]
    #[sqlx(rename = "session_state")]
    pub session_state: Option<String>,
}

/// Input for linking an OAuth account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub user_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(rename = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(rename = "access_token")]
    pub access_token: Option<String>,
    #[serde(rename = "expires_at")]
    pub expires_at: Option<i64>,
    #[serde(rename = "token_type")]
    pub token_type: Option<String>,
    pub scope: Option<String>,
    #[serde(rename = "id_token")]
    pub id_token: Option<String>,
    #[serde(rename = "session_state")]
    pub session_state: Option<String>,
}

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

/// A single-use email verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// A registered Kidoo device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Kidoo {
    pub id: String,
    pub name: String,
    pub model: String,
    pub mac_address: Option<String>,
    pub bluetooth_mac_address: Option<String>,
    /// Hardware identifier, unique across all devices.
    pub device_id: String,
    pub firmware_version: Option<String>,
    pub last_connected: Option<DateTime<Utc>>,
    pub is_connected: bool,
    #[serde(rename = "wifiSSID")]
    #[sqlx(rename = "wifiSSID")]
    pub wifi_ssid: Option<String>,
    pub is_synced: bool,
    pub brightness: i32,
    /// Milliseconds before the device goes to sleep.
    pub sleep_timeout: i32,
    pub sleep_color_r: Option<i32>,
    pub sleep_color_g: Option<i32>,
    pub sleep_color_b: Option<i32>,
    pub sleep_effect: Option<i32>,
    /// Owner; `None` for an unclaimed device.
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default LED brightness for new devices.
pub const DEFAULT_BRIGHTNESS: i32 = 50;

/// Default sleep timeout for new devices, in milliseconds.
pub const DEFAULT_SLEEP_TIMEOUT: i32 = 30_000;

/// Input for registering a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewKidoo {
    pub id: Option<String>,
    pub name: String,
    pub model: String,
    pub device_id: String,
    pub mac_address: Option<String>,
    pub bluetooth_mac_address: Option<String>,
    pub firmware_version: Option<String>,
    #[serde(rename = "wifiSSID")]
    pub wifi_ssid: Option<String>,
    /// Defaults to [`DEFAULT_BRIGHTNESS`].
    pub brightness: Option<i32>,
    /// Defaults to [`DEFAULT_SLEEP_TIMEOUT`].
    pub sleep_timeout: Option<i32>,
    pub user_id: Option<String>,
}

/// An NFC tag bound to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    /// Application-level tag identifier, unique when present.
    pub tag_id: Option<String>,
    /// Hardware UID read from the chip.
    pub uid: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub tag_type: Option<TagType>,
    pub kidoo_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub id: Option<String>,
    pub tag_id: Option<String>,
    pub uid: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub tag_type: Option<TagType>,
    pub kidoo_id: String,
    pub user_id: String,
}

/// An uploaded media file attached to a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub url: String,
    pub path: String,
    pub file_name: String,
    pub original_name: String,
    /// Size in bytes.
    pub size: i32,
    pub mime_type: String,
    /// Playback position within the tag.
    pub order: i32,
    pub disabled: bool,
    pub tag_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub id: Option<String>,
    pub url: String,
    pub path: String,
    pub file_name: String,
    pub original_name: String,
    pub size: i32,
    pub mime_type: String,
    /// Explicit position; appended after the last file of the tag when absent.
    pub order: Option<i32>,
    pub disabled: bool,
    pub tag_id: String,
    pub user_id: String,
}

/// Storage telemetry reported by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct KidooConfigBasic {
    pub id: String,
    pub kidoo_id: String,
    pub storage_total_bytes: Option<i64>,
    pub storage_free_bytes: Option<i64>,
    pub storage_used_bytes: Option<i64>,
    pub storage_free_percent: Option<i32>,
    pub storage_used_percent: Option<i32>,
    pub storage_last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A storage report as sent by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageReport {
    pub total_bytes: Option<i64>,
    pub free_bytes: Option<i64>,
    /// Derived from total and free when absent.
    pub used_bytes: Option<i64>,
}

/// Night-light and sleep behaviour of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct KidooConfigDream {
    pub id: String,
    pub kidoo_id: String,
    pub color_r: Option<i32>,
    pub color_g: Option<i32>,
    pub color_b: Option<i32>,
    pub brightness: Option<i32>,
    /// Keep the light on for the whole night.
    pub all_night: bool,
    pub effect: Option<String>,
    pub wakeup_color_r: Option<i32>,
    pub wakeup_color_g: Option<i32>,
    pub wakeup_color_b: Option<i32>,
    pub wakeup_brightness: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable dream settings, used for both create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamSettings {
    pub color_r: Option<i32>,
    pub color_g: Option<i32>,
    pub color_b: Option<i32>,
    pub brightness: Option<i32>,
    pub all_night: bool,
    pub effect: Option<String>,
    pub wakeup_color_r: Option<i32>,
    pub wakeup_color_g: Option<i32>,
    pub wakeup_color_b: Option<i32>,
    pub wakeup_brightness: Option<i32>,
}

impl From<&KidooConfigDream> for DreamSettings {
    fn from(config: &KidooConfigDream) -> Self {
        Self {
            color_r: config.color_r,
            color_g: config.color_g,
            color_b: config.color_b,
            brightness: config.brightness,
            all_night: config.all_night,
            effect: config.effect.clone(),
            wakeup_color_r: config.wakeup_color_r,
            wakeup_color_g: config.wakeup_color_g,
            wakeup_color_b: config.wakeup_color_b,
            wakeup_brightness: config.wakeup_brightness,
        }
    }
}

/// A bedtime or wake-up schedule entry for one weekday.
///
/// Both schedule tables share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct DreamSchedule {
    pub id: String,
    pub kidoo_config_dream_id: String,
    pub weekday: String,
    pub hour: i32,
    pub minute: i32,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for one schedule entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub weekday: String,
    pub hour: i32,
    pub minute: i32,
    pub activated: bool,
}

impl ScheduleEntry {
    /// An activated entry.
    pub fn new(weekday: impl Into<String>, hour: i32, minute: i32) -> Self {
        Self {
            weekday: weekday.into(),
            hour,
            minute,
            activated: true,
        }
    }
}

/// Dream configuration together with its schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DreamConfigWithSchedules {
    #[serde(flatten)]
    pub config: KidooConfigDream,
    pub bedtime_schedules: Vec<DreamSchedule>,
    pub wakeup_schedules: Vec<DreamSchedule>,
}

/// A device with its optional configuration records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KidooDetails {
    #[serde(flatten)]
    pub kidoo: Kidoo,
    pub config_basic: Option<KidooConfigBasic>,
    pub config_dream: Option<DreamConfigWithSchedules>,
}

/// A tag with its files in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagWithFiles {
    #[serde(flatten)]
    pub tag: Tag,
    pub multimedia_files: Vec<File>,
}
