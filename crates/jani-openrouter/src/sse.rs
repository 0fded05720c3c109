// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token streaming over Server-Sent Events.
//!
//! Framing (blank-line separation, `data:` prefixes, `:` comments, UTF-8
//! boundaries split across chunks) is handled by `eventsource-stream`.
//! This module interprets each payload: `[DONE]` ends the stream, an
//! `error` object fails it, JSON payloads yield `choices[0].delta.content`,
//! anything else is forwarded verbatim.

use std::fmt::Display;
use std::ops::ControlFlow;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use jani_core::{JaniError, TokenSink};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Terminal payload sent by OpenAI-compatible streams.
pub const DONE_MARKER: &str = "[DONE]";

/// Accumulates streamed tokens and forwards each one to a sink.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    done: bool,
}

impl StreamAccumulator {
    /// Handles one event payload. Returns `Break` once `[DONE]` is seen.
    ///
    /// A payload carrying a top-level `error` object ends the stream with
    /// [`JaniError::Provider`]; tokens already forwarded stay forwarded.
    pub fn push(&mut self, data: &str, sink: &mut dyn TokenSink) -> Result<ControlFlow<()>, JaniError> {
        let data = data.trim();
        if data == DONE_MARKER {
            self.done = true;
            return Ok(ControlFlow::Break(()));
        }
        if data.is_empty() {
            return Ok(ControlFlow::Continue(()));
        }

        let token = match serde_json::from_str::<Value>(data) {
            Ok(payload) => {
                if let Some(err) = payload.get("error") {
                    return Err(stream_error(err));
                }
                payload
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            }
            Err(_) => {
                warn!(payload = data, "non-JSON SSE payload, forwarding raw");
                data.to_string()
            }
        };

        if !token.is_empty() {
            self.text.push_str(&token);
            sink.on_token(&token);
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Whether the terminal marker was received.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Maps an in-stream `{"error": {"code", "message"}}` object.
fn stream_error(err: &Value) -> JaniError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    let status = err
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok());
    error!(status, message = %message, "OpenRouter reported an error mid-stream");
    JaniError::Provider {
        status,
        message: format!("stream error: {message}"),
        source: None,
    }
}

/// Reads a streaming response to completion.
///
/// Returns the accumulated raw text. Cancellation drops the body stream,
/// which closes the connection, and yields [`JaniError::Cancelled`].
pub async fn read_token_stream(
    response: reqwest::Response,
    sink: &mut dyn TokenSink,
    cancel: &CancellationToken,
) -> Result<String, JaniError> {
    read_event_stream(response.bytes_stream(), sink, cancel).await
}

/// Decodes SSE events from raw body chunks, in whatever sizes they arrive.
pub async fn read_event_stream<S, B, E>(
    body: S,
    sink: &mut dyn TokenSink,
    cancel: &CancellationToken,
) -> Result<String, JaniError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let events = body.eventsource();
    let mut events = std::pin::pin!(events);
    let mut acc = StreamAccumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(received = acc.text().len(), "stream cancelled by caller");
                return Err(JaniError::Cancelled);
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                if acc.push(&event.data, sink)?.is_break() {
                    break;
                }
            }
            Some(Err(e)) => {
                return Err(JaniError::Network {
                    message: jani_security::redact(&format!("SSE stream error: {e}"), &[]),
                    source: None,
                });
            }
            None => break,
        }
    }

    if !acc.is_done() {
        debug!("stream ended without [DONE] marker");
    }
    Ok(acc.into_text())
}
