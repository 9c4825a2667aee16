//! SQLite-backed record store.
//!
//! ```sql
//! CREATE TABLE emotions        (user_id, name, value, updated_at, PRIMARY KEY (user_id, name));
//! CREATE TABLE emotion_history (id, user_id, name, old_value, new_value, trigger, recorded_at);
//! CREATE TABLE characters      (user_id PRIMARY KEY, data /* JSON */, updated_at);
//! CREATE TABLE characteristics (id PRIMARY KEY, user_id, kind, key, value, relevance,
//!                               created_at, last_accessed_at, last_reinforced_at, source, version);
//! ```
//!
//! Trait-level state is one JSON document per user so the schema stays
//! stable as fields are added. Timestamps are RFC 3339 text.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{CharacterRecord, CharacteristicFilter, EmotionHistoryEntry, HISTORY_MIN_DELTA, RecordStore};
use crate::characteristic::Characteristic;
use crate::config::PersistenceConfig;
use crate::emotion::{Emotion, EmotionChange};
use crate::error::{AnimaError, Result};
use crate::types::{CharacteristicId, Timestamp, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS emotions (
    user_id    TEXT NOT NULL,
    name       TEXT NOT NULL,
    value      REAL NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, name)
);
CREATE TABLE IF NOT EXISTS emotion_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    old_value   REAL NOT NULL,
    new_value   REAL NOT NULL,
    trigger     TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_emotion_history_user ON emotion_history (user_id, id);
CREATE TABLE IF NOT EXISTS characters (
    user_id    TEXT PRIMARY KEY,
    data       TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS characteristics (
    id                 TEXT PRIMARY KEY,
    user_id            TEXT NOT NULL,
    kind               TEXT NOT NULL,
    key                TEXT,
    value              TEXT NOT NULL,
    relevance          REAL NOT NULL,
    created_at         TEXT NOT NULL,
    last_accessed_at   TEXT NOT NULL,
    last_reinforced_at TEXT NOT NULL,
    source             TEXT NOT NULL,
    version            INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_characteristics_lookup ON characteristics (user_id, kind, key);
";

/// Handle to an open SQLite database holding companion state.
///
/// # Usage
///
/// ```no_run
/// # use anima_core::persistence::{RecordStore, SqliteStore};
/// # use anima_core::config::PersistenceConfig;
/// # use anima_core::types::UserId;
/// let store = SqliteStore::open("anima.db", &PersistenceConfig::default())?;
/// let character = store.load_character(&UserId::default())?;
/// # Ok::<(), anima_core::error::AnimaError>(())
/// ```
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

/// Raw characteristic row before enum and timestamp parsing.
struct CharacteristicRow {
    id: String,
    kind: String,
    key: Option<String>,
    value: String,
    relevance: f64,
    created_at: String,
    last_accessed_at: String,
    last_reinforced_at: String,
    source: String,
    version: i64,
}

fn parse_time(raw: &str) -> Result<Timestamp> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AnimaError::Serialization(format!("bad timestamp '{raw}': {e}")))
}

#[allow(clippy::cast_possible_truncation)]
impl CharacteristicRow {
    fn into_characteristic(self) -> Result<Characteristic> {
        let id = Uuid::parse_str(&self.id).map_err(|e| AnimaError::Serialization(e.to_string()))?;
        Ok(Characteristic {
            id: CharacteristicId(id),
            kind: self.kind.parse()?,
            key: self.key,
            value: self.value,
            relevance: self.relevance as f32,
            created_at: parse_time(&self.created_at)?,
            last_accessed_at: parse_time(&self.last_accessed_at)?,
            last_reinforced_at: parse_time(&self.last_reinforced_at)?,
            source: self.source.parse()?,
            version: u32::try_from(self.version).unwrap_or(u32::MAX),
        })
    }
}

impl SqliteStore {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AnimaError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            // journal_mode returns a row, so it cannot go through execute().
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_millis(u64::from(config.busy_timeout_ms)))?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "anima record store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open the database at the configured `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`AnimaError::Database`] on SQLite failures.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        Self::open(&config.db_path, config)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`AnimaError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path of the database file (`:memory:` for in-memory databases).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`AnimaError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let conn = self.conn.lock();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "record store backup completed"
        );
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn load_emotions(&self, user: &UserId) -> Result<Vec<(Emotion, f32)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT name, value FROM emotions WHERE user_id = ?1")?;
        let rows = stmt.query_map(params![user.0], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            let (name, value) = row?;
            match name.parse::<Emotion>() {
                #[allow(clippy::cast_possible_truncation)]
                Ok(emotion) => out.push((emotion, value as f32)),
                Err(_) => warn!(user = %user, name = %name, "skipping stored emotion outside the vocabulary"),
            }
        }
        Ok(out)
    }

    fn save_emotion(&self, user: &UserId, change: &EmotionChange, trigger: &str, at: Timestamp) -> Result<()> {
        let conn = self.conn.lock();
        let at = at.to_rfc3339();
        conn.prepare_cached(
            "INSERT INTO emotions (user_id, name, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )?
        .execute(params![user.0, change.emotion.as_str(), f64::from(change.new), at])?;
        if change.delta().abs() >= HISTORY_MIN_DELTA {
            conn.prepare_cached(
                "INSERT INTO emotion_history (user_id, name, old_value, new_value, trigger, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                user.0,
                change.emotion.as_str(),
                f64::from(change.old),
                f64::from(change.new),
                trigger,
                at
            ])?;
        }
        Ok(())
    }

    fn emotion_history(&self, user: &UserId, limit: usize) -> Result<Vec<EmotionHistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT name, old_value, new_value, trigger, recorded_at FROM emotion_history
             WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user.0, limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (name, old_value, new_value, trigger, recorded_at) = row?;
            #[allow(clippy::cast_possible_truncation)]
            out.push(EmotionHistoryEntry {
                emotion: name.parse()?,
                old_value: old_value as f32,
                new_value: new_value as f32,
                trigger,
                recorded_at: parse_time(&recorded_at)?,
            });
        }
        Ok(out)
    }

    fn load_character(&self, user: &UserId) -> Result<Option<CharacterRecord>> {
        let conn = self.conn.lock();
        let data: Option<String> = conn
            .prepare_cached("SELECT data FROM characters WHERE user_id = ?1")?
            .query_row(params![user.0], |row| row.get(0))
            .optional()?;
        data.map(|json| serde_json::from_str(&json).map_err(|e| AnimaError::Serialization(e.to_string())))
            .transpose()
    }

    fn save_character(&self, user: &UserId, record: &CharacterRecord) -> Result<()> {
        let json = serde_json::to_string(record).map_err(|e| AnimaError::Serialization(e.to_string()))?;
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO characters (user_id, data, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
        )?
        .execute(params![user.0, json, Utc::now().to_rfc3339()])?;
        debug!(user = %user, attachment = record.attachment, "saved character");
        Ok(())
    }

    fn load_characteristics(&self, user: &UserId, filter: &CharacteristicFilter) -> Result<Vec<Characteristic>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, kind, key, value, relevance, created_at, last_accessed_at,
                    last_reinforced_at, source, version
             FROM characteristics
             WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2) AND relevance >= ?3
             ORDER BY relevance DESC
             LIMIT ?4",
        )?;
        let limit = filter.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let rows = stmt.query_map(
            params![
                user.0,
                filter.kind.map(|k| k.as_str()),
                f64::from(filter.min_relevance),
                limit
            ],
            |row| {
                Ok(CharacteristicRow {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    key: row.get(2)?,
                    value: row.get(3)?,
                    relevance: row.get(4)?,
                    created_at: row.get(5)?,
                    last_accessed_at: row.get(6)?,
                    last_reinforced_at: row.get(7)?,
                    source: row.get(8)?,
                    version: row.get(9)?,
                })
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            match row?.into_characteristic() {
                Ok(c) => out.push(c),
                Err(e) => warn!(user = %user, error = %e, "skipping unreadable characteristic row"),
            }
        }
        Ok(out)
    }

    fn insert_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT OR REPLACE INTO characteristics
                (id, user_id, kind, key, value, relevance, created_at, last_accessed_at,
                 last_reinforced_at, source, version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?
        .execute(params![
            record.id.0.to_string(),
            user.0,
            record.kind.as_str(),
            record.key,
            record.value,
            f64::from(record.relevance),
            record.created_at.to_rfc3339(),
            record.last_accessed_at.to_rfc3339(),
            record.last_reinforced_at.to_rfc3339(),
            record.source.as_str(),
            i64::from(record.version)
        ])?;
        Ok(())
    }

    fn update_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn
            .prepare_cached(
                "UPDATE characteristics SET
                    kind = ?3, key = ?4, value = ?5, relevance = ?6, last_accessed_at = ?7,
                    last_reinforced_at = ?8, source = ?9, version = ?10
                 WHERE id = ?1 AND user_id = ?2",
            )?
            .execute(params![
                record.id.0.to_string(),
                user.0,
                record.kind.as_str(),
                record.key,
                record.value,
                f64::from(record.relevance),
                record.last_accessed_at.to_rfc3339(),
                record.last_reinforced_at.to_rfc3339(),
                record.source.as_str(),
                i64::from(record.version)
            ])?;
        if updated == 0 {
            return Err(AnimaError::CharacteristicNotFound(record.id));
        }
        Ok(())
    }

    fn reinforce_characteristic(
        &self,
        user: &UserId,
        id: CharacteristicId,
        relevance: f32,
        version: u32,
        at: Timestamp,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let at = at.to_rfc3339();
        let updated = conn
            .prepare_cached(
                "UPDATE characteristics SET
                    relevance = ?3, version = ?4, last_accessed_at = ?5, last_reinforced_at = ?5
                 WHERE id = ?1 AND user_id = ?2",
            )?
            .execute(params![id.0.to_string(), user.0, f64::from(relevance), i64::from(version), at])?;
        if updated == 0 {
            return Err(AnimaError::CharacteristicNotFound(id));
        }
        Ok(())
    }

    fn delete_characteristic(&self, user: &UserId, id: CharacteristicId) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached("DELETE FROM characteristics WHERE id = ?1 AND user_id = ?2")?
            .execute(params![id.0.to_string(), user.0])?;
        Ok(())
    }
}
