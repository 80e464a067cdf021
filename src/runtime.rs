//! Runtime for diary sessions
//!
//! Sessions live in memory, keyed by id and owned by one user. A turn locks
//! the session to apply the user's message, releases it for the completion
//! call, then locks again to apply the result. A second message arriving in
//! between sees the session busy.
//!
//! A session is dropped once it ends with nothing left to retry. Sessions
//! left idle longer than the manager's TTL are evicted, so abandoned and
//! unsaved transcripts do not accumulate.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{gateway_error_kind, DiarySession, SessionView};
pub use traits::*;

use crate::gateway::CompletionGateway;
use crate::state_machine::{ConvContext, ErrorKind, Event, TransitionError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Idle time after which a session is evicted
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Type alias for the production session manager
pub type ProductionSessions = SessionManager<Arc<CompletionGateway>, DatabaseStorage>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{message}")]
    Completion { kind: ErrorKind, message: String },
    #[error("Failed to load today's entry: {0}")]
    Store(String),
}

type SessionHandle = Arc<Mutex<DiarySession>>;

/// Manager for all live sessions
pub struct SessionManager<C, S> {
    client: C,
    store: S,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    idle_ttl: Duration,
}

impl<C, S> SessionManager<C, S>
where
    C: CompletionClient,
    S: EntryStore,
{
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            sessions: RwLock::new(HashMap::new()),
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    #[must_use]
    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a session, seeded from today's entry if one exists
    pub async fn start(&self, user_id: &str) -> Result<SessionView, SessionError> {
        self.evict_idle(Instant::now()).await;

        let today = self
            .store
            .find_today_entry(user_id)
            .await
            .map_err(SessionError::Store)?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let context = ConvContext::new(
            session_id.clone(),
            user_id,
            today.map(|entry| entry.summary),
        );
        let continuing = context.previous_summary.is_some();
        let session = DiarySession::new(context);
        let view = session.view();

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(Mutex::new(session)));

        tracing::info!(session_id = %session_id, user_id, continuing, "Started diary session");
        Ok(view)
    }

    pub async fn get(&self, user_id: &str, session_id: &str) -> Result<SessionView, SessionError> {
        let handle = self.session(user_id, session_id).await?;
        let session = handle.lock().await;
        Ok(session.view())
    }

    /// Run one user turn
    pub async fn send_message(
        &self,
        user_id: &str,
        session_id: &str,
        text: String,
    ) -> Result<SessionView, SessionError> {
        let handle = self.session(user_id, session_id).await?;

        let job = {
            let mut session = handle.lock().await;
            session
                .process_event(Event::UserMessage { text }, &self.store)
                .await?
        };
        let Some(job) = job else {
            return Err(TransitionError::InvalidTransition(
                "message did not start a completion".to_string(),
            )
            .into());
        };

        tracing::debug!(session_id, transcript_len = job.transcript.len(), "Requesting completion");
        let outcome = self.client.complete(&job.transcript, &job.options).await;

        let mut session = handle.lock().await;
        let result = match outcome {
            Ok(raw) => {
                session
                    .process_event(Event::CompletionReceived { raw }, &self.store)
                    .await?;
                if session.state().is_terminal() {
                    tracing::info!(session_id, state = ?session.state(), "Diary session ended");
                }
                Ok(session.view())
            }
            Err(e) => {
                let kind = gateway_error_kind(&e);
                let message = e.to_string();
                tracing::warn!(session_id, error = %message, ?kind, "Completion failed");
                session
                    .process_event(
                        Event::CompletionFailed {
                            message: message.clone(),
                            error_kind: kind,
                        },
                        &self.store,
                    )
                    .await?;
                Err(SessionError::Completion { kind, message })
            }
        };

        let finished = session.is_finished();
        drop(session);
        if finished {
            self.release(session_id).await;
        }
        result
    }

    /// Retry a failed entry save
    pub async fn retry_save(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<SessionView, SessionError> {
        let handle = self.session(user_id, session_id).await?;
        let (view, finished) = {
            let mut session = handle.lock().await;
            session.process_event(Event::RetrySave, &self.store).await?;
            (session.view(), session.is_finished())
        };
        if finished {
            self.release(session_id).await;
        }
        Ok(view)
    }

    /// Close a session without saving; its transcript is discarded
    pub async fn cancel(&self, user_id: &str, session_id: &str) -> Result<SessionView, SessionError> {
        let handle = self.session(user_id, session_id).await?;
        let view = {
            let mut session = handle.lock().await;
            session.process_event(Event::UserCancel, &self.store).await?;
            session.view()
        };
        self.sessions.write().await.remove(session_id);
        tracing::info!(session_id, "Closed diary session");
        Ok(view)
    }

    /// Drop sessions idle longer than the TTL; returns how many were removed.
    ///
    /// Sessions with a completion in flight or currently locked are kept.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => session.state().is_busy() || session.idle_for(now) < self.idle_ttl,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, live = sessions.len(), "Evicted idle diary sessions");
        }
        evicted
    }

    /// Number of sessions held in memory
    #[allow(dead_code)] // Used in tests
    pub async fn live_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn release(&self, session_id: &str) {
        if self.sessions.write().await.remove(session_id).is_some() {
            tracing::debug!(session_id, "Released finished diary session");
        }
    }

    async fn session(&self, user_id: &str, session_id: &str) -> Result<SessionHandle, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        // Other users' sessions are indistinguishable from missing ones
        if handle.lock().await.user_id() != user_id {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        Ok(handle)
    }
}
