//! Episode record store
//!
//! One SQLite table tracks which episodes have already been archived across
//! runs. Schema changes are additive and idempotent: on startup any missing
//! column is added rather than recreating the table, so databases written by
//! older versions keep working.

use crate::error::{DatabaseError, Error, Result};
use crate::feed::Episode;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Persisted knowledge about one episode, keyed by guid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredEpisode {
    /// Enclosure size in bytes at archive time, when the feed advertised one
    pub length: Option<u64>,
    /// Publication time at archive time
    pub published_time: Option<DateTime<Utc>>,
}

/// The persisted episode table
///
/// Any number of download tasks may call [`exists`](Self::exists) and
/// [`add`](Self::add) concurrently; access is serialized by the underlying
/// connection pool.
pub struct RecordStore {
    pool: SqlitePool,
    ignore_existing: bool,
}

impl RecordStore {
    /// Open (or create) the record store at `path` and run migrations
    pub async fn open(path: &Path, ignore_existing: bool) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {e}"
                )))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {e}"
                )))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        Self::connect(options, ignore_existing).await
    }

    /// Open an in-memory record store (used by tests and dry runs)
    pub async fn open_in_memory(ignore_existing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
        })?;
        Self::connect(options, ignore_existing).await
    }

    async fn connect(options: SqliteConnectOptions, ignore_existing: bool) -> Result<Self> {
        // One connection, shared by every worker; concurrent reads and writes
        // serialize on the pool checkout, matching SQLite's writer model.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to connect to database: {e}"
                )))
            })?;

        let store = Self {
            pool,
            ignore_existing,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the additive schema migrations
    async fn migrate(&self) -> Result<()> {
        debug!("migrating episode record store");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS episodes(
                guid TEXT UNIQUE NOT NULL,
                title TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create episodes table: {e}"
            )))
        })?;

        self.add_column_if_missing("length", "ALTER TABLE episodes ADD COLUMN length UNSIGNED BIG INT")
            .await?;
        self.add_column_if_missing(
            "published_time",
            "ALTER TABLE episodes ADD COLUMN published_time TIMESTAMP",
        )
        .await?;

        Ok(())
    }

    async fn add_column_if_missing(&self, name: &str, alter_stmt: &str) -> Result<()> {
        let present: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM pragma_table_info('episodes') WHERE name = ?)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to probe episodes schema: {e}"
            )))
        })?;

        if present == 0 {
            debug!(column = name, "adding missing record store column");
            sqlx::query(alter_stmt).execute(&self.pool).await.map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to add column {name}: {e}"
                )))
            })?;
        }
        Ok(())
    }

    /// Record an episode as archived (insert-or-replace keyed on guid)
    ///
    /// Write failures are logged at debug level and swallowed; the media
    /// file on disk stays the source of truth.
    pub async fn add(&self, episode: &Episode) {
        let result = sqlx::query(
            "INSERT OR REPLACE INTO episodes(guid, title, length, published_time) VALUES (?, ?, ?, ?)",
        )
        .bind(&episode.guid)
        .bind(&episode.title)
        .bind(episode.enclosure.length.map(|length| length as i64))
        .bind(episode.published_time.to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            debug!(guid = %episode.guid, error = %e, "error adding episode to record store");
        }
    }

    /// Look up the stored entry for a guid, if any
    ///
    /// Returns `None` unconditionally when the store was opened with
    /// `ignore_existing`.
    pub async fn exists(&self, guid: &str) -> Result<Option<StoredEpisode>> {
        if self.ignore_existing {
            return Ok(None);
        }

        let row = sqlx::query("SELECT length, published_time FROM episodes WHERE guid = ?")
            .bind(guid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e.to_string())))?;

        Ok(row.map(|row| StoredEpisode {
            length: row
                .try_get::<Option<i64>, _>("length")
                .ok()
                .flatten()
                .map(|length| length as u64),
            published_time: row
                .try_get::<Option<String>, _>("published_time")
                .ok()
                .flatten()
                .and_then(|value| DateTime::parse_from_rfc3339(&value).ok())
                .map(|time| time.with_timezone(&Utc)),
        }))
    }
}
