//! Database module for InnerNote
//!
//! Provides persistence for diary entries.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Entry Operations ====================

    /// Today's entry for a user, keyed by UTC calendar day
    pub fn find_today_entry(&self, user_id: &str) -> DbResult<Option<DiaryEntry>> {
        self.find_entry_for_day(user_id, &Utc::now())
    }

    /// Entry for the UTC day containing `at`
    pub fn find_entry_for_day(
        &self,
        user_id: &str,
        at: &DateTime<Utc>,
    ) -> DbResult<Option<DiaryEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT id, user_id, summary, mood, timestamp
                 FROM diary_entries WHERE user_id = ?1 AND day = ?2",
                params![user_id, day_key(at)],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Write today's summary and mood, replacing an existing same-day entry
    pub fn upsert_entry(&self, user_id: &str, summary: &str, mood: &str) -> DbResult<DiaryEntry> {
        self.upsert_entry_at(user_id, summary, mood, &Utc::now())
    }

    /// Upsert keyed on the UTC day containing `at`.
    ///
    /// A single statement against the `(user_id, day)` unique index, so two
    /// writers for the same user and day cannot produce two rows.
    pub fn upsert_entry_at(
        &self,
        user_id: &str,
        summary: &str,
        mood: &str,
        at: &DateTime<Utc>,
    ) -> DbResult<DiaryEntry> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();

        let entry = conn.query_row(
            "INSERT INTO diary_entries (id, user_id, day, summary, mood, timestamp, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_id, day) DO UPDATE SET
                 summary = excluded.summary,
                 mood = excluded.mood,
                 timestamp = excluded.timestamp
             RETURNING id, user_id, summary, mood, timestamp",
            params![id, user_id, day_key(at), summary, mood, at.to_rfc3339()],
            entry_from_row,
        )?;

        tracing::debug!(entry_id = %entry.id, user_id, day = %day_key(at), "Upserted diary entry");
        Ok(entry)
    }

    /// All entries for a user, newest first
    pub fn list_entries(&self, user_id: &str) -> DbResult<Vec<DiaryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, summary, mood, timestamp
             FROM diary_entries WHERE user_id = ?1
             ORDER BY timestamp DESC",
        )?;

        let rows = stmt.query_map(params![user_id], entry_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<DiaryEntry> {
    Ok(DiaryEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        summary: row.get(2)?,
        mood: row.get(3)?,
        timestamp: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
