//! Per-session event processing
//!
//! A [`DiarySession`] owns one day's transcript and its state. Events are fed
//! through the pure transition function; effects that only touch the session
//! run inline, entry writes run against the store and chain their outcome
//! back as events, and completion requests are handed back to the caller so
//! the session lock is never held across the gateway call.

use super::traits::EntryStore;
use crate::gateway::{CompletionOptions, GatewayError};
use crate::llm::Message;
use crate::prompt;
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Ending, ErrorKind, Event, SaveStatus,
    TransitionError,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// A completion call the caller must perform outside the session lock
#[derive(Debug, Clone)]
pub struct CompletionJob {
    /// Transcript plus the pending user message
    pub transcript: Vec<Message>,
    pub options: CompletionOptions,
}

/// Last error surfaced to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

/// Client-facing snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: String,
    pub state: &'static str,
    pub transcript: Vec<Message>,
    pub follow_ups: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionErrorInfo>,
    pub created_at: DateTime<Utc>,
}

enum Followup {
    Event(Event),
    Completion(CompletionJob),
}

/// One diary conversation
#[derive(Debug)]
pub struct DiarySession {
    context: ConvContext,
    state: ConvState,
    transcript: Vec<Message>,
    follow_ups: u32,
    last_error: Option<SessionErrorInfo>,
    created_at: DateTime<Utc>,
    last_active: Instant,
}

impl DiarySession {
    /// New session seeded with the greeting for the user's day
    pub fn new(context: ConvContext) -> Self {
        let greeting = prompt::greeting(context.previous_summary.as_deref());
        Self {
            context,
            state: ConvState::default(),
            transcript: vec![Message::assistant(greeting)],
            follow_ups: 0,
            last_error: None,
            created_at: Utc::now(),
            last_active: Instant::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.context.user_id
    }

    pub fn state(&self) -> &ConvState {
        &self.state
    }

    #[allow(dead_code)] // Used in tests
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Time since the last event was applied
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active)
    }

    /// Ended with nothing left to retry
    pub fn is_finished(&self) -> bool {
        match &self.state {
            ConvState::Terminated {
                ending: Ending::Summarized { save, .. },
            } => *save == SaveStatus::Saved,
            ConvState::Terminated { .. } => true,
            _ => false,
        }
    }

    pub fn view(&self) -> SessionView {
        let (summary, mood, saved) = match &self.state {
            ConvState::Terminated {
                ending:
                    Ending::Summarized {
                        summary,
                        mood,
                        save,
                    },
            } => (
                Some(summary.clone()),
                Some(mood.clone()),
                *save == SaveStatus::Saved,
            ),
            _ => (None, None, false),
        };

        SessionView {
            id: self.context.session_id.clone(),
            state: self.state.name(),
            transcript: self.transcript.clone(),
            follow_ups: self.follow_ups,
            summary,
            mood,
            saved,
            error: self.last_error.clone(),
            created_at: self.created_at,
        }
    }

    /// Process an event and any events chained from its effects.
    ///
    /// Returns the completion call to perform, if the event started one.
    pub async fn process_event<S: EntryStore + ?Sized>(
        &mut self,
        event: Event,
        store: &S,
    ) -> Result<Option<CompletionJob>, TransitionError> {
        let mut events_to_process = vec![event];
        let mut job = None;
        self.last_active = Instant::now();

        while let Some(current_event) = events_to_process.pop() {
            let clears_error = matches!(
                current_event,
                Event::UserMessage { .. } | Event::EntrySaved
            );

            let result = transition(&self.state, &self.context, current_event)?;
            self.state = result.new_state;
            if let Some(n) = self.state.follow_ups() {
                self.follow_ups = n;
            }
            if clears_error {
                self.last_error = None;
            }

            for effect in result.effects {
                match self.execute_effect(effect, store).await {
                    Some(Followup::Event(next)) => events_to_process.push(next),
                    Some(Followup::Completion(next)) => job = Some(next),
                    None => {}
                }
            }
        }

        Ok(job)
    }

    async fn execute_effect<S: EntryStore + ?Sized>(
        &mut self,
        effect: Effect,
        store: &S,
    ) -> Option<Followup> {
        match effect {
            Effect::AppendMessage { message } => {
                self.transcript.push(message);
                None
            }

            Effect::RequestCompletion { pending, options } => {
                let mut transcript = self.transcript.clone();
                transcript.push(Message::user(pending));
                Some(Followup::Completion(CompletionJob {
                    transcript,
                    options,
                }))
            }

            Effect::SaveEntry { summary, mood } => {
                match store
                    .upsert_entry(&self.context.user_id, &summary, &mood)
                    .await
                {
                    Ok(entry) => {
                        tracing::info!(
                            session_id = %self.context.session_id,
                            entry_id = %entry.id,
                            mood = %entry.mood,
                            "Saved diary entry"
                        );
                        Some(Followup::Event(Event::EntrySaved))
                    }
                    Err(message) => {
                        tracing::error!(
                            session_id = %self.context.session_id,
                            error = %message,
                            "Failed to save diary entry"
                        );
                        Some(Followup::Event(Event::EntrySaveFailed { message }))
                    }
                }
            }

            Effect::NotifyError {
                error_kind,
                message,
            } => {
                self.last_error = Some(SessionErrorInfo {
                    kind: error_kind,
                    message,
                });
                None
            }

            Effect::DiscardTranscript => {
                self.transcript.clear();
                None
            }
        }
    }
}

/// Error category for a failed gateway call
pub fn gateway_error_kind(error: &GatewayError) -> ErrorKind {
    match error {
        GatewayError::NotConfigured => ErrorKind::Configuration,
        GatewayError::Precondition(_) => ErrorKind::InvalidRequest,
        GatewayError::Upstream(_) => ErrorKind::UpstreamService,
    }
}
