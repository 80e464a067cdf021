//! Completion gateway
//!
//! Stateless bridge between a diary transcript and the completion service.
//! Every call rebuilds the full upstream conversation from the transcript,
//! so a failed call can be repeated with the same input.

use crate::llm::{LlmError, LlmRequest, Message, ModelRegistry};
use crate::prompt;
use std::sync::Arc;
use thiserror::Error;

const TEMPERATURE: f32 = 0.8;
const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Per-call framing options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    /// Earlier summary from the same day, merged into the new one
    pub previous_summary: Option<String>,
    /// Set once the follow-up cap is reached
    pub force_summary: bool,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Server configuration error: no completion model is configured")]
    NotConfigured,
    #[error("Failed to construct valid chat history: {0}")]
    Precondition(String),
    #[error("Failed to get response from AI service: {0}")]
    Upstream(#[from] LlmError),
}

/// Build the upstream request for a transcript.
///
/// The upstream conversation is: framing instruction (user), priming
/// acknowledgement (model), optional previous-context exchange, the
/// transcript without its seeded greeting, and a closing nudge (user).
pub fn build_request(
    transcript: &[Message],
    options: &CompletionOptions,
) -> Result<LlmRequest, GatewayError> {
    let history = match transcript.split_first() {
        Some((first, rest)) if !first.is_user() => rest,
        _ => transcript,
    };

    let mut messages = Vec::with_capacity(history.len() + 5);
    messages.push(Message::user(prompt::system_instruction()));
    messages.push(Message::assistant(prompt::PRIMING_ACK));

    if let Some(previous) = options
        .previous_summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let (context, ack) = prompt::previous_context_turns(previous);
        messages.push(Message::user(context));
        messages.push(Message::assistant(ack));
    }

    messages.extend(history.iter().cloned());
    messages.push(Message::user(prompt::continue_nudge(options.force_summary)));

    if !messages.first().is_some_and(Message::is_user) {
        return Err(GatewayError::Precondition(
            "upstream history must start with a user message".to_string(),
        ));
    }

    Ok(LlmRequest {
        messages,
        temperature: Some(TEMPERATURE),
        max_tokens: Some(MAX_OUTPUT_TOKENS),
    })
}

/// Gateway over the configured default model
pub struct CompletionGateway {
    registry: Arc<ModelRegistry>,
}

impl CompletionGateway {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn is_configured(&self) -> bool {
        self.registry.default().is_some()
    }

    /// Send the transcript upstream and return the raw reply text
    pub async fn complete(
        &self,
        transcript: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        let service = self.registry.default().ok_or(GatewayError::NotConfigured)?;
        let request = build_request(transcript, options)?;

        tracing::debug!(
            model = service.model_id(),
            transcript_len = transcript.len(),
            upstream_len = request.messages.len(),
            force_summary = options.force_summary,
            "Sending transcript to completion service"
        );

        let response = service.complete(&request).await?;
        Ok(response.text)
    }
}
