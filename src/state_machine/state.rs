//! Conversation state types

use serde::{Deserialize, Serialize};

/// Follow-up replies allowed before the model must conclude
pub const DEFAULT_MAX_FOLLOW_UPS: u32 = crate::prompt::MAX_FOLLOW_UPS;

/// Error categories surfaced to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credential or model; not retryable
    Configuration,
    InvalidRequest,
    /// Completion service failed; the user may resend
    UpstreamService,
    /// Reply did not follow the output contract; forces termination
    ResponseFormat,
    /// Entry store write failed; the save may be retried
    Persistence,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Outcome of a save attempt for a summarized conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveStatus {
    Pending,
    Saved,
    Failed { message: String },
}

/// How a conversation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Ending {
    /// Terminal reply received; summary and mood go to the entry store
    Summarized {
        summary: String,
        mood: String,
        save: SaveStatus,
    },
    /// Reply broke the output contract; nothing is saved
    FormatError { message: String },
    /// Closed by the user; transcript discarded
    Cancelled,
}

/// Conversation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// Ready for the next user message
    AwaitingUserInput { follow_ups: u32 },

    /// Completion call in flight for `pending`, which is not yet in the transcript
    AwaitingCompletion { follow_ups: u32, pending: String },

    /// No further messages accepted
    Terminated { ending: Ending },
}

impl Default for ConvState {
    fn default() -> Self {
        ConvState::AwaitingUserInput { follow_ups: 0 }
    }
}

impl ConvState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConvState::Terminated { .. })
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ConvState::AwaitingCompletion { .. })
    }

    /// Follow-up replies received so far (frozen once terminated)
    pub fn follow_ups(&self) -> Option<u32> {
        match self {
            ConvState::AwaitingUserInput { follow_ups }
            | ConvState::AwaitingCompletion { follow_ups, .. } => Some(*follow_ups),
            ConvState::Terminated { .. } => None,
        }
    }

    /// Wire name of the state
    pub fn name(&self) -> &'static str {
        match self {
            ConvState::AwaitingUserInput { .. } => "awaiting_user_input",
            ConvState::AwaitingCompletion { .. } => "awaiting_completion",
            ConvState::Terminated { .. } => "terminated",
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ConvContext {
    pub session_id: String,
    pub user_id: String,
    /// Today's earlier summary, if the user already wrote an entry
    pub previous_summary: Option<String>,
    pub max_follow_ups: u32,
}

impl ConvContext {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        previous_summary: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            previous_summary: previous_summary.filter(|s| !s.trim().is_empty()),
            max_follow_ups: DEFAULT_MAX_FOLLOW_UPS,
        }
    }

    #[must_use]
    pub fn with_max_follow_ups(mut self, max_follow_ups: u32) -> Self {
        self.max_follow_ups = max_follow_ups;
        self
    }
}
