//! Pure state transition function
//!
//! Given the same state, context, and event this always produces the same
//! result. All I/O (completion calls, entry writes) is described by the
//! returned effects and carried out by the runtime.

use super::state::{Ending, ErrorKind, SaveStatus};
use super::{ConvContext, ConvState, Effect, Event};
use crate::gateway::CompletionOptions;
use crate::prompt::UNCLEAR_REPLY;
use crate::reply::{parse_reply, ReplyKind};
use thiserror::Error;

/// Message recorded when the reply cannot be parsed
pub const FORMAT_ERROR_MESSAGE: &str = "AI response format error";

const FOLLOW_UP_LIMIT_MESSAGE: &str =
    "AI response format error: follow-up limit reached without a summary";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still being generated; wait for it before sending another message")]
    Busy,
    #[error("This conversation has ended; start a new one")]
    Ended,
    #[error("Message text cannot be empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User messages
        // ============================================================
        (ConvState::AwaitingUserInput { follow_ups }, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let options = CompletionOptions {
                previous_summary: context.previous_summary.clone(),
                force_summary: *follow_ups >= context.max_follow_ups,
            };
            Ok(TransitionResult::new(ConvState::AwaitingCompletion {
                follow_ups: *follow_ups,
                pending: text.clone(),
            })
            .with_effect(Effect::RequestCompletion {
                pending: text,
                options,
            }))
        }

        (ConvState::AwaitingCompletion { .. }, Event::UserMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        (ConvState::Terminated { .. }, Event::UserMessage { .. }) => Err(TransitionError::Ended),

        // ============================================================
        // Completion results
        // ============================================================
        (
            ConvState::AwaitingCompletion {
                follow_ups,
                pending,
            },
            Event::CompletionReceived { raw },
        ) => Ok(handle_completion(*follow_ups, pending, &raw, context)),

        // Failure leaves the transcript untouched so the user can resend
        (
            ConvState::AwaitingCompletion { follow_ups, .. },
            Event::CompletionFailed {
                message,
                error_kind,
            },
        ) => Ok(TransitionResult::new(ConvState::AwaitingUserInput {
            follow_ups: *follow_ups,
        })
        .with_effect(Effect::notify_error(error_kind, message))),

        // Late or duplicate results after termination are ignored
        (
            ConvState::Terminated { .. },
            Event::CompletionReceived { .. } | Event::CompletionFailed { .. },
        ) => Ok(TransitionResult::new(state.clone())),

        (
            ConvState::AwaitingUserInput { .. },
            Event::CompletionReceived { .. } | Event::CompletionFailed { .. },
        ) => Err(TransitionError::InvalidTransition(
            "no completion is in flight".to_string(),
        )),

        // ============================================================
        // Cancellation
        // ============================================================
        (
            ConvState::AwaitingUserInput { .. } | ConvState::AwaitingCompletion { .. },
            Event::UserCancel,
        ) => Ok(TransitionResult::new(ConvState::Terminated {
            ending: Ending::Cancelled,
        })
        .with_effect(Effect::DiscardTranscript)),

        (ConvState::Terminated { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::DiscardTranscript))
        }

        // ============================================================
        // Entry store outcomes
        // ============================================================
        (
            ConvState::Terminated {
                ending:
                    Ending::Summarized {
                        summary,
                        mood,
                        save: SaveStatus::Pending,
                    },
            },
            Event::EntrySaved,
        ) => Ok(TransitionResult::new(summarized(summary, mood, SaveStatus::Saved))),

        (
            ConvState::Terminated {
                ending:
                    Ending::Summarized {
                        summary,
                        mood,
                        save: SaveStatus::Pending,
                    },
            },
            Event::EntrySaveFailed { message },
        ) => Ok(TransitionResult::new(summarized(
            summary,
            mood,
            SaveStatus::Failed {
                message: message.clone(),
            },
        ))
        .with_effect(Effect::notify_error(ErrorKind::Persistence, message))),

        (_, Event::EntrySaved | Event::EntrySaveFailed { .. }) => Err(
            TransitionError::InvalidTransition("no save is pending".to_string()),
        ),

        (
            ConvState::Terminated {
                ending:
                    Ending::Summarized {
                        summary,
                        mood,
                        save: SaveStatus::Failed { .. },
                    },
            },
            Event::RetrySave,
        ) => Ok(
            TransitionResult::new(summarized(summary, mood, SaveStatus::Pending)).with_effect(
                Effect::SaveEntry {
                    summary: summary.clone(),
                    mood: mood.clone(),
                },
            ),
        ),

        (_, Event::RetrySave) => Ok(TransitionResult::new(state.clone())),
    }
}

fn summarized(summary: &str, mood: &str, save: SaveStatus) -> ConvState {
    ConvState::Terminated {
        ending: Ending::Summarized {
            summary: summary.to_string(),
            mood: mood.to_string(),
            save,
        },
    }
}

/// Apply a raw completion to the pending turn.
///
/// The user message and the assistant reply are appended together so the
/// transcript never holds an unanswered user turn.
fn handle_completion(
    follow_ups: u32,
    pending: &str,
    raw: &str,
    context: &ConvContext,
) -> TransitionResult {
    let append_user = Effect::append_user(pending);

    let reply = match parse_reply(raw) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(session_id = %context.session_id, error = %e, "Unparseable completion");
            let shown = if raw.trim().is_empty() {
                UNCLEAR_REPLY
            } else {
                raw
            };
            return format_error(FORMAT_ERROR_MESSAGE).with_effects([
                append_user,
                Effect::append_assistant(shown),
                Effect::notify_error(ErrorKind::ResponseFormat, FORMAT_ERROR_MESSAGE),
            ]);
        }
    };

    match reply.into_kind() {
        ReplyKind::FollowUp { response } if follow_ups >= context.max_follow_ups => {
            tracing::warn!(
                session_id = %context.session_id,
                follow_ups,
                "Follow-up received after the limit"
            );
            format_error(FOLLOW_UP_LIMIT_MESSAGE).with_effects([
                append_user,
                Effect::append_assistant(response),
                Effect::notify_error(ErrorKind::ResponseFormat, FOLLOW_UP_LIMIT_MESSAGE),
            ])
        }
        ReplyKind::FollowUp { response } => TransitionResult::new(ConvState::AwaitingUserInput {
            follow_ups: follow_ups + 1,
        })
        .with_effects([append_user, Effect::append_assistant(response)]),
        ReplyKind::Terminal {
            response,
            summary,
            mood,
        } => TransitionResult::new(summarized(&summary, &mood, SaveStatus::Pending)).with_effects([
            append_user,
            Effect::append_assistant(response),
            Effect::SaveEntry { summary, mood },
        ]),
    }
}

fn format_error(message: &str) -> TransitionResult {
    TransitionResult::new(ConvState::Terminated {
        ending: Ending::FormatError {
            message: message.to_string(),
        },
    })
}
