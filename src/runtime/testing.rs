//! Mock implementations for testing
//!
//! These mocks enable session tests without real I/O.

use super::traits::*;
use crate::db::{day_key, DiaryEntry};
use crate::gateway::{CompletionOptions, GatewayError};
use crate::llm::{LlmError, Message};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Completion Client
// ============================================================================

/// Mock completion client that returns queued replies
pub struct MockCompletionClient {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    /// Record of all calls made
    pub calls: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
    /// When set, each call waits for a permit before replying
    gate: Option<Arc<Notify>>,
    started: Notify,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            gate: None,
            started: Notify::new(),
        }
    }

    /// Hold every call until the returned handle is notified
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let client = Self {
            gate: Some(gate.clone()),
            ..Self::new()
        };
        (client, gate)
    }

    /// Queue a raw reply
    pub fn queue_reply(&self, raw: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(raw.into()));
    }

    /// Queue a follow-up question in the reply format
    pub fn queue_follow_up(&self, question: &str) {
        self.queue_reply(
            serde_json::json!({"response": question, "summary": null, "mood": null}).to_string(),
        );
    }

    /// Queue a terminal reply in the reply format
    pub fn queue_terminal(&self, summary: &str, mood: &str) {
        self.queue_reply(
            serde_json::json!({
                "response": "Okay, I've saved a summary of your day.",
                "summary": summary,
                "mood": mood,
            })
            .to_string(),
        );
    }

    /// Queue an error
    pub fn queue_error(&self, error: GatewayError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded calls
    pub fn recorded_calls(&self) -> Vec<(Vec<Message>, CompletionOptions)> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until a call has been recorded
    pub async fn wait_for_call(&self) {
        let notified = self.started.notified();
        if self.calls.lock().unwrap().is_empty() {
            notified.await;
        }
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        transcript: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((transcript.to_vec(), options.clone()));
        self.started.notify_waiters();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(GatewayError::Upstream(LlmError::network(
                "No mock reply queued",
            )))
        })
    }
}

// ============================================================================
// Mock Entry Store
// ============================================================================

/// In-memory entry store keyed by user and UTC day
#[derive(Default)]
pub struct MockEntryStore {
    entries: Mutex<Vec<(String, DiaryEntry)>>,
    /// Every upsert attempt as (user, summary, mood)
    upserts: Mutex<Vec<(String, String, String)>>,
    failures_remaining: Mutex<usize>,
}

impl MockEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed today's entry for a user
    pub fn with_today_entry(self, user_id: &str, summary: &str, mood: &str) -> Self {
        let now = Utc::now();
        self.entries.lock().unwrap().push((
            day_key(&now),
            DiaryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                summary: summary.to_string(),
                mood: mood.to_string(),
                timestamp: now,
            },
        ));
        self
    }

    /// Make the next `n` upserts fail
    pub fn fail_next_upserts(&self, n: usize) {
        *self.failures_remaining.lock().unwrap() = n;
    }

    pub fn upserts(&self) -> Vec<(String, String, String)> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<DiaryEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }
}

#[async_trait]
impl EntryStore for MockEntryStore {
    async fn find_today_entry(&self, user_id: &str) -> Result<Option<DiaryEntry>, String> {
        let today = day_key(&Utc::now());
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|(day, e)| *day == today && e.user_id == user_id)
            .map(|(_, e)| e.clone()))
    }

    async fn upsert_entry(
        &self,
        user_id: &str,
        summary: &str,
        mood: &str,
    ) -> Result<DiaryEntry, String> {
        self.upserts.lock().unwrap().push((
            user_id.to_string(),
            summary.to_string(),
            mood.to_string(),
        ));

        {
            let mut failures = self.failures_remaining.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err("Database error: disk I/O error".to_string());
            }
        }

        let now = Utc::now();
        let today = day_key(&now);
        let mut entries = self.entries.lock().unwrap();
        if let Some((_, existing)) = entries
            .iter_mut()
            .find(|(day, e)| *day == today && e.user_id == user_id)
        {
            existing.summary = summary.to_string();
            existing.mood = mood.to_string();
            existing.timestamp = now;
            return Ok(existing.clone());
        }

        let entry = DiaryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            summary: summary.to_string(),
            mood: mood.to_string(),
            timestamp: now,
        };
        entries.push((today, entry.clone()));
        Ok(entry)
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<DiaryEntry>, String> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e)| e.user_id == user_id)
            .map(|(_, e)| e.clone())
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
