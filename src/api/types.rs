//! API request and response types

use crate::db::DiaryEntry;
use crate::llm::Message;
use crate::navigation::NavigationAction;
use crate::reply::ReplyKind;
use serde::{Deserialize, Serialize};

/// Transcript turn in the completion service's wire shape.
///
/// Only the history array itself is validated strictly; a turn with missing
/// fields still decodes and is sorted out by [`WireMessage::into_message`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub role: WireRole,
    #[serde(default)]
    pub parts: Vec<WirePart>,
    /// Flat text, accepted alongside `parts`
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    #[serde(alias = "assistant")]
    Model,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WirePart {
    #[serde(default)]
    pub text: String,
}

impl WireMessage {
    /// Transcript message for this turn; `None` when the role is not one the
    /// completion service accepts
    pub fn into_message(self) -> Option<Message> {
        let mut text: String = self.parts.into_iter().map(|p| p.text).collect();
        if let Some(flat) = self.text {
            text.push_str(&flat);
        }
        match self.role {
            WireRole::User => Some(Message::user(text)),
            WireRole::Model => Some(Message::assistant(text)),
            WireRole::Unknown => None,
        }
    }
}

/// Stateless chat request: the client holds the transcript
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub history: Vec<WireMessage>,
    #[serde(default)]
    pub previous_summary: Option<String>,
}

/// Reply to a stateless chat request
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
    pub summary: Option<String>,
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ReplyKind> for ChatResponse {
    fn from(kind: ReplyKind) -> Self {
        match kind {
            ReplyKind::FollowUp { response } => Self {
                response,
                summary: None,
                mood: None,
                error: None,
            },
            ReplyKind::Terminal {
                response,
                summary,
                mood,
            } => Self {
                response,
                summary: Some(summary),
                mood: Some(mood),
                error: None,
            },
        }
    }
}

/// Request to send a message in a session
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Response with a list of entries
#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<DiaryEntry>,
}

/// Response with today's entry, if any
#[derive(Debug, Serialize)]
pub struct TodayEntryResponse {
    pub entry: Option<DiaryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub action: NavigationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
