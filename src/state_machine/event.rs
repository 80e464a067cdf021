//! Events that can occur in a conversation

use super::state::ErrorKind;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    UserCancel,

    // Completion events
    CompletionReceived {
        raw: String,
    },
    CompletionFailed {
        message: String,
        error_kind: ErrorKind,
    },

    // Entry store events
    EntrySaved,
    EntrySaveFailed {
        message: String,
    },
    RetrySave,
}
