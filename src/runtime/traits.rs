//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the session manager with mock implementations.

use crate::db::{DiaryEntry, Database};
use crate::gateway::{CompletionGateway, CompletionOptions, GatewayError};
use crate::llm::Message;
use async_trait::async_trait;
use std::sync::Arc;

/// Client for completion calls
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the transcript upstream and return the raw reply text
    async fn complete(
        &self,
        transcript: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, GatewayError>;
}

/// Storage for diary entries
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Today's entry for the user, if one was already written
    async fn find_today_entry(&self, user_id: &str) -> Result<Option<DiaryEntry>, String>;

    /// Update today's entry or insert a new one
    async fn upsert_entry(
        &self,
        user_id: &str,
        summary: &str,
        mood: &str,
    ) -> Result<DiaryEntry, String>;

    /// All entries for the user, newest first
    async fn list_entries(&self, user_id: &str) -> Result<Vec<DiaryEntry>, String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(
        &self,
        transcript: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        (**self).complete(transcript, options).await
    }
}

#[async_trait]
impl<T: EntryStore + ?Sized> EntryStore for Arc<T> {
    async fn find_today_entry(&self, user_id: &str) -> Result<Option<DiaryEntry>, String> {
        (**self).find_today_entry(user_id).await
    }

    async fn upsert_entry(
        &self,
        user_id: &str,
        summary: &str,
        mood: &str,
    ) -> Result<DiaryEntry, String> {
        (**self).upsert_entry(user_id, summary, mood).await
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<DiaryEntry>, String> {
        (**self).list_entries(user_id).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

#[async_trait]
impl CompletionClient for CompletionGateway {
    async fn complete(
        &self,
        transcript: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        CompletionGateway::complete(self, transcript, options).await
    }
}

/// Adapter to use Database as an entry store
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntryStore for DatabaseStorage {
    async fn find_today_entry(&self, user_id: &str) -> Result<Option<DiaryEntry>, String> {
        self.db.find_today_entry(user_id).map_err(|e| e.to_string())
    }

    async fn upsert_entry(
        &self,
        user_id: &str,
        summary: &str,
        mood: &str,
    ) -> Result<DiaryEntry, String> {
        self.db
            .upsert_entry(user_id, summary, mood)
            .map_err(|e| e.to_string())
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<DiaryEntry>, String> {
        self.db.list_entries(user_id).map_err(|e| e.to_string())
    }
}
