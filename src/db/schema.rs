//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS diary_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    day TEXT NOT NULL,
    summary TEXT NOT NULL,
    mood TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- One entry per user per UTC calendar day
CREATE UNIQUE INDEX IF NOT EXISTS idx_diary_entries_user_day ON diary_entries(user_id, day);
CREATE INDEX IF NOT EXISTS idx_diary_entries_user_timestamp ON diary_entries(user_id, timestamp DESC);
";

/// Diary entry record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: String,
    pub user_id: String,
    pub summary: String,
    pub mood: String,
    pub timestamp: DateTime<Utc>,
}

/// Deduplication key for a timestamp
pub fn day_key(at: &DateTime<Utc>) -> String {
    at.date_naive().format("%Y-%m-%d").to_string()
}
