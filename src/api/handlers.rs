//! HTTP request handlers

use super::identity::CurrentUser;
use super::types::{
    ChatRequest, ChatResponse, EntriesResponse, ErrorResponse, NavigationQuery,
    NavigationResponse, SendMessageRequest, TodayEntryResponse, WireMessage,
};
use super::AppState;
use crate::gateway::{CompletionOptions, GatewayError};
use crate::llm::Message;
use crate::navigation;
use crate::prompt::{MAX_FOLLOW_UPS, UNCLEAR_REPLY};
use crate::reply::parse_reply;
use crate::runtime::{EntryStore, SessionError, SessionView};
use crate::state_machine::transition::FORMAT_ERROR_MESSAGE;
use crate::state_machine::{ErrorKind, TransitionError};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Stateless chat; the client holds the transcript
        .route("/api/chat", post(chat))
        // Server-held sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/messages", post(send_message))
        .route("/api/sessions/:id/save", post(retry_save))
        .route("/api/sessions/:id/cancel", post(cancel_session))
        // Entries
        .route("/api/entries", get(list_entries))
        .route("/api/entries/today", get(today_entry))
        // Redirect decisions
        .route("/api/navigation", get(navigation_action))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Stateless Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    if !state.gateway.is_configured() {
        tracing::error!("Chat requested but no completion model is configured");
        return Err(AppError::Internal("Server configuration error.".to_string()));
    }

    let Json(request) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let turns = request.history.len();
    let transcript: Vec<Message> = request
        .history
        .into_iter()
        .filter_map(WireMessage::into_message)
        .collect();
    if transcript.len() < turns {
        tracing::warn!(
            skipped = turns - transcript.len(),
            "Dropped history turns with an unrecognized role"
        );
    }
    let options = CompletionOptions {
        previous_summary: request.previous_summary,
        force_summary: follow_ups_in(&transcript) >= MAX_FOLLOW_UPS,
    };

    let raw = state
        .gateway
        .complete(&transcript, &options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Chat completion failed");
            match e {
                GatewayError::NotConfigured => {
                    AppError::Internal("Server configuration error.".to_string())
                }
                other => AppError::Internal(other.to_string()),
            }
        })?;

    match parse_reply(&raw) {
        Ok(reply) => Ok(Json(reply.into_kind().into())),
        Err(e) => {
            tracing::warn!(error = %e, raw_len = raw.len(), "Chat reply did not match the format");
            let response = if raw.trim().is_empty() {
                UNCLEAR_REPLY.to_string()
            } else {
                raw
            };
            Ok(Json(ChatResponse {
                response,
                summary: None,
                mood: None,
                error: Some(FORMAT_ERROR_MESSAGE.to_string()),
            }))
        }
    }
}

/// Prefix of the notice the web client appends as a model turn when a request fails
const CLIENT_ERROR_NOTICE: &str = "Sorry, an error occurred";

/// Follow-up replies in a client-held transcript.
///
/// Skips the leading greeting and the client's own error notices.
fn follow_ups_in(transcript: &[Message]) -> u32 {
    let replies = transcript
        .iter()
        .skip_while(|m| !m.is_user())
        .filter(|m| !m.is_user() && !m.text.starts_with(CLIENT_ERROR_NOTICE))
        .count();
    u32::try_from(replies).unwrap_or(u32::MAX)
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = state.sessions.start(&user_id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.get(&user_id, &id).await?))
}

async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SessionView>, AppError> {
    let Json(request) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
    Ok(Json(
        state
            .sessions
            .send_message(&user_id, &id, request.text)
            .await?,
    ))
}

async fn retry_save(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.retry_save(&user_id, &id).await?))
}

async fn cancel_session(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.cancel(&user_id, &id).await?))
}

// ============================================================
// Entries
// ============================================================

async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<EntriesResponse>, AppError> {
    let entries = state
        .sessions
        .store()
        .list_entries(&user_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(EntriesResponse { entries }))
}

async fn today_entry(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<TodayEntryResponse>, AppError> {
    let entry = state
        .sessions
        .store()
        .find_today_entry(&user_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(TodayEntryResponse { entry }))
}

// ============================================================
// Navigation
// ============================================================

async fn navigation_action(
    user: Option<CurrentUser>,
    query: Result<Query<NavigationQuery>, QueryRejection>,
) -> Result<Json<NavigationResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let action = navigation::decide(user.is_some(), navigation::is_auth_route(&query.path));
    Ok(Json(NavigationResponse {
        action,
        location: action.location(),
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("innernote ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        let message = error.to_string();
        match error {
            SessionError::NotFound(_) => AppError::NotFound(message),
            SessionError::Transition(TransitionError::EmptyMessage) => AppError::BadRequest(message),
            SessionError::Transition(_) => AppError::Conflict(message),
            SessionError::Completion {
                kind: ErrorKind::UpstreamService,
                ..
            } => AppError::BadGateway(message),
            SessionError::Completion {
                kind: ErrorKind::Configuration,
                ..
            } => AppError::Internal("Server configuration error.".to_string()),
            SessionError::Completion { .. } | SessionError::Store(_) => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
