// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events streaming for chat replies.
//!
//! SSE event format:
//! ```text
//! event: token
//! data: {"text": "partial content"}
//!
//! event: done
//! data: {"reply": "...", "character_id": 1, ...}
//! ```
//!
//! A failed exchange ends with a single `error` event carrying the same
//! body as the JSON error response. Dropping the connection cancels the
//! generation.

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use jani_agent::{ChatReply, ChatRequest};
use jani_core::JaniError;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::handlers::ChatResponse;
use crate::server::GatewayState;

enum StreamMessage {
    Token(String),
    Finished(Result<ChatReply, JaniError>),
}

/// Runs the exchange on a background task and streams its tokens.
pub fn stream_chat(
    state: GatewayState,
    request: ChatRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<StreamMessage>();
    let cancel = CancellationToken::new();
    let disconnect_guard = cancel.clone().drop_guard();
    let orchestrator = state.orchestrator.clone();

    tokio::spawn(async move {
        let token_tx = tx.clone();
        let mut sink = move |token: &str| {
            let _ = token_tx.send(StreamMessage::Token(token.to_string()));
        };
        let result = orchestrator
            .process_message(request, Some(&mut sink), &cancel)
            .await;
        if let Err(JaniError::Cancelled) = &result {
            tracing::debug!("client disconnected, generation cancelled");
        }
        let _ = tx.send(StreamMessage::Finished(result));
    });

    let events = stream::unfold(
        (rx, Some(disconnect_guard)),
        |(mut rx, guard)| async move {
            let guard = guard?;
            match rx.recv().await? {
                StreamMessage::Token(text) => {
                    Some((Ok(token_event(&text)), (rx, Some(guard))))
                }
                StreamMessage::Finished(result) => {
                    guard.disarm();
                    Some((Ok(final_event(result)), (rx, None)))
                }
            }
        },
    );

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn token_event(text: &str) -> Event {
    Event::default()
        .event("token")
        .data(json!({ "text": text }).to_string())
}

fn final_event(result: Result<ChatReply, JaniError>) -> Event {
    match result {
        Ok(reply) => {
            let body = serde_json::to_value(ChatResponse::from(reply)).unwrap_or_default();
            Event::default().event("done").data(body.to_string())
        }
        Err(err) => Event::default()
            .event("error")
            .data(ApiError::from(err).body().to_string()),
    }
}
