//! Effects produced by state transitions

use super::state::ErrorKind;
use crate::gateway::CompletionOptions;
use crate::llm::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the session transcript
    AppendMessage { message: Message },

    /// Send the transcript plus the pending message to the gateway
    RequestCompletion {
        pending: String,
        options: CompletionOptions,
    },

    /// Upsert today's entry
    SaveEntry { summary: String, mood: String },

    /// Record an error for the client
    NotifyError {
        error_kind: ErrorKind,
        message: String,
    },

    /// Drop the transcript without writing anything
    DiscardTranscript,
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            message: Message::user(text),
        }
    }

    pub fn append_assistant(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            message: Message::assistant(text),
        }
    }

    pub fn notify_error(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Effect::NotifyError {
            error_kind,
            message: message.into(),
        }
    }
}
