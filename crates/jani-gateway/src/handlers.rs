// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the chat API.

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use jani_agent::prompt::order_history;
use jani_agent::{ChatReply, ChatRequest};
use jani_core::ActionEnvelope;
use jani_core::types::{
    CharacterId, ChatSession, DialogMessage, DialogRole, Identity, MemoryRecord, UserId,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::sse;

/// Default and maximum page size of `GET .../messages`.
pub const DEFAULT_HISTORY_PAGE: usize = 50;
pub const MAX_HISTORY_PAGE: usize = 100;

/// Request body for `POST .../messages`.
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Successful chat response, also sent as the final SSE `done` event.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub character_id: CharacterId,
    pub character_name: String,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub envelope: Option<ActionEnvelope>,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            reply: reply.reply,
            character_id: reply.character.id,
            character_name: reply.character.name,
            user_id: reply.user_id,
            envelope: reply.envelope,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<DialogMessage>,
}

#[derive(Debug, Serialize)]
pub struct MemoriesResponse {
    pub memories: Vec<MemoryRecord>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// POST /api/chat/{character_id}/messages
///
/// Streams SSE when the client sends `Accept: text/event-stream`.
pub async fn post_message(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(character_id): Path<CharacterId>,
    headers: HeaderMap,
    Json(body): Json<MessageBody>,
) -> Result<Response, ApiError> {
    let text = body.message.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("empty_message", "message must not be empty"));
    }
    let request = ChatRequest::new(identity, text).with_character(character_id);
    respond(state, request, &headers).await
}

/// POST /api/chat/{character_id}/regenerate
///
/// Re-answers the last stored user line without storing it again.
pub async fn post_regenerate(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(character_id): Path<CharacterId>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let store = state.orchestrator.store();
    let user = store
        .find_or_create_user(identity.external_id, identity.username.as_deref())
        .await?;
    let history = order_history(
        store
            .recent_messages(user.id, character_id, state.history_limit)
            .await?,
    );
    let last_user = history
        .iter()
        .rev()
        .find(|m| m.role == DialogRole::User)
        .ok_or_else(|| {
            ApiError::bad_request("no_user_message", "there is no message to regenerate")
        })?;

    let request = ChatRequest::new(identity, last_user.text.clone())
        .with_character(character_id)
        .regenerate();
    respond(state, request, &headers).await
}

async fn respond(
    state: GatewayState,
    request: ChatRequest,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    if wants_event_stream(headers) {
        return Ok(sse::stream_chat(state, request).into_response());
    }
    let reply = state
        .orchestrator
        .process_message(request, None, &CancellationToken::new())
        .await?;
    Ok(Json(ChatResponse::from(reply)).into_response())
}

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// GET /api/chat/{character_id}/messages?limit=
pub async fn get_messages(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(character_id): Path<CharacterId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_PAGE)
        .clamp(1, MAX_HISTORY_PAGE);
    let store = state.orchestrator.store();
    let user = store
        .find_or_create_user(identity.external_id, identity.username.as_deref())
        .await?;
    let messages = order_history(store.recent_messages(user.id, character_id, limit).await?);
    Ok(Json(HistoryResponse { messages }))
}

/// GET /api/chat/{character_id}/session
pub async fn get_session(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(character_id): Path<CharacterId>,
) -> Result<Json<ChatSession>, ApiError> {
    let store = state.orchestrator.store();
    let user = store
        .find_or_create_user(identity.external_id, identity.username.as_deref())
        .await?;
    Ok(Json(store.get_or_create_session(user.id, character_id).await?))
}

/// GET /api/chat/{character_id}/memories
pub async fn get_memories(
    State(state): State<GatewayState>,
    Extension(identity): Extension<Identity>,
    Path(character_id): Path<CharacterId>,
) -> Result<Json<MemoriesResponse>, ApiError> {
    let store = state.orchestrator.store();
    let user = store
        .find_or_create_user(identity.external_id, identity.username.as_deref())
        .await?;
    let memories = store.list_memories(user.id, character_id).await?;
    Ok(Json(MemoriesResponse { memories }))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
