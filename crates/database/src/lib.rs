//! SQLite persistence layer for Kidoo.
//!
//! This crate provides async database operations for users, devices, NFC tags,
//! media files, device configuration and authentication records using SQLx
//! with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use kidoo_database::{kidoo, user, Database, NewKidoo, NewUser};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:kidoo.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let owner = user::create_user(
//!         db.pool(),
//!         &NewUser {
//!             email: "a@x.com".to_string(),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//!
//!     kidoo::create_kidoo(
//!         db.pool(),
//!         &NewKidoo {
//!             name: "Bedroom".to_string(),
//!             model: "dream".to_string(),
//!             device_id: "dev-1".to_string(),
//!             user_id: Some(owner.id),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod dream_schedule;
pub mod error;
pub mod file;
pub mod kidoo;
pub mod kidoo_config_basic;
pub mod kidoo_config_dream;
pub mod models;
pub mod query;
pub mod session;
pub mod tag;
pub mod user;
pub mod validation;
pub mod verification_token;

pub use dream_schedule::ScheduleKind;
pub use error::{DatabaseError, Result};
pub use models::{
    Account, DreamConfigWithSchedules, DreamSchedule, DreamSettings, File, Kidoo,
    KidooConfigBasic, KidooConfigDream, KidooDetails, NewAccount, NewFile, NewKidoo, NewTag,
    NewUser, ScheduleEntry, Session, StorageReport, Tag, TagType, TagWithFiles, User,
    VerificationToken,
};
pub use query::{Aggregate, GroupBy, ListOptions, OrderBy, SortOrder};
pub use validation::ValidationError;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

/// Generate a new primary key.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Transaction isolation level requested by a caller.
///
/// SQLite serializes writers on its own; `Serializable` additionally takes the
/// write lock when the transaction starts instead of at the first write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionIsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TransactionIsolationLevel {
    fn begin_statement(&self) -> &'static str {
        match self {
            TransactionIsolationLevel::Serializable => "BEGIN IMMEDIATE",
            _ => "BEGIN DEFERRED",
        }
    }
}

impl fmt::Display for TransactionIsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionIsolationLevel::ReadUncommitted => "ReadUncommitted",
            TransactionIsolationLevel::ReadCommitted => "ReadCommitted",
            TransactionIsolationLevel::RepeatableRead => "RepeatableRead",
            TransactionIsolationLevel::Serializable => "Serializable",
        };
        f.write_str(name)
    }
}

impl FromStr for TransactionIsolationLevel {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ReadUncommitted" => Ok(TransactionIsolationLevel::ReadUncommitted),
            "ReadCommitted" => Ok(TransactionIsolationLevel::ReadCommitted),
            "RepeatableRead" => Ok(TransactionIsolationLevel::RepeatableRead),
            "Serializable" => Ok(TransactionIsolationLevel::Serializable),
            other => Err(DatabaseError::InvalidQuery(format!(
                "unknown isolation level: {}",
                other
            ))),
        }
    }
}

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    pub const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` sees its own database, so the pool
    /// is limited to one connection.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction at the requested isolation level.
    pub async fn begin(
        &self,
        level: TransactionIsolationLevel,
    ) -> Result<Transaction<'static, Sqlite>> {
        tracing::debug!(isolation = %level, "Beginning transaction");
        let tx = self.pool.begin_with(level.begin_statement()).await?;
        Ok(tx)
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_scenario_bedtime_schedule() {
        let db = test_db().await;

        let owner = seed_user(&db, "a@x.com").await;
        let device = seed_kidoo(&db, "dev-1", Some(&owner.id)).await;
        let settings = DreamSettings::default();
        let dream = kidoo_config_dream::create_config_dream(db.pool(), &device.id, &settings)
            .await
            .unwrap();
        dream_schedule::create_schedule(
            db.pool(),
            ScheduleKind::Bedtime,
            &dream.id,
            &ScheduleEntry::new("MON", 21, 30),
        )
        .await
        .unwrap();

        let details = kidoo::get_kidoo_details(db.pool(), &device.id).await.unwrap();
        assert_eq!(details.kidoo.user_id.as_deref(), Some(owner.id.as_str()));
        assert!(details.config_basic.is_none());

        let dream = details.config_dream.unwrap();
        assert_eq!(dream.bedtime_schedules.len(), 1);
        assert_eq!(dream.bedtime_schedules[0].weekday, "MON");
        assert_eq!(dream.bedtime_schedules[0].hour, 21);
        assert_eq!(dream.bedtime_schedules[0].minute, 30);
        assert!(dream.wakeup_schedules.is_empty());
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let db = test_db().await;

        let owner = seed_user(&db, "owner@x.com").await;
        let device = seed_kidoo(&db, "dev-1", Some(&owner.id)).await;
        let tag = seed_tag(&db, "tag-1", &device.id, &owner.id).await;
        file::create_file(
            db.pool(),
            &NewFile {
                url: "https://cdn.example.com/a.mp3".to_string(),
                path: "a.mp3".to_string(),
                file_name: "a.mp3".to_string(),
                original_name: "A.mp3".to_string(),
                size: 1024,
                mime_type: "audio/mpeg".to_string(),
                tag_id: tag.id.clone(),
                user_id: owner.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        account::link_account(
            db.pool(),
            &NewAccount {
                user_id: owner.id.clone(),
                account_type: "oauth".to_string(),
                provider: "google".to_string(),
                provider_account_id: "g-1".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        session::create_session(
            db.pool(),
            "token-1",
            &owner.id,
            chrono::Utc::now() + chrono::Duration::days(30),
        )
        .await
        .unwrap();

        user::delete_user(db.pool(), &owner.id).await.unwrap();

        // Owned records are gone, the device survives unowned.
        assert_eq!(tag::count_tags(db.pool()).await.unwrap(), 0);
        assert_eq!(file::count_files(db.pool()).await.unwrap(), 0);
        assert!(account::list_accounts_by_user(db.pool(), &owner.id)
            .await
            .unwrap()
            .is_empty());
        assert!(session::find_session(db.pool(), "token-1")
            .await
            .unwrap()
            .is_none());

        let device = kidoo::get_kidoo(db.pool(), &device.id).await.unwrap();
        assert!(device.user_id.is_none());
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let db = test_db().await;

        let mut tx = db
            .begin(TransactionIsolationLevel::Serializable)
            .await
            .unwrap();
        let created = user::create_user(
            &mut *tx,
            &NewUser {
                email: "tx@x.com".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(user::find_user(&mut *tx, &created.id).await.unwrap().is_some());
        tx.rollback().await.unwrap();

        assert!(user::find_user(db.pool(), &created.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_transaction_commit_spans_modules() {
        let db = test_db().await;

        let mut tx = db.begin(TransactionIsolationLevel::default()).await.unwrap();
        let owner = user::create_user(
            &mut *tx,
            &NewUser {
                email: "owner@x.com".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let device = kidoo::create_kidoo(
            &mut *tx,
            &NewKidoo {
                name: "Bedroom".to_string(),
                model: "dream".to_string(),
                device_id: "dev-tx".to_string(),
                user_id: Some(owner.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let details = kidoo::get_kidoo_details(&mut *tx, &device.id).await.unwrap();
        assert_eq!(details.kidoo.user_id.as_deref(), Some(owner.id.as_str()));
        tx.commit().await.unwrap();

        let listed = kidoo::list_kidoos_by_user(db.pool(), &owner.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn test_isolation_level_from_str() {
        assert_eq!(
            "Serializable".parse::<TransactionIsolationLevel>().unwrap(),
            TransactionIsolationLevel::Serializable
        );
        assert_eq!(
            TransactionIsolationLevel::ReadUncommitted.to_string(),
            "ReadUncommitted"
        );
        assert!("Snapshot".parse::<TransactionIsolationLevel>().is_err());
    }
}
