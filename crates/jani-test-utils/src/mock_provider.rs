// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted LLM provider for deterministic tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use jani_core::traits::{PluginAdapter, ProviderAdapter, TokenSink};
use jani_core::types::{AdapterType, HealthStatus};
use jani_core::{Completion, JaniError, Message, ProviderRequest, ProviderTag};
use tokio_util::sync::CancellationToken;

/// Reply used when the script is empty.
pub const DEFAULT_MOCK_REPLY: &str = "mock response";

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    /// Fails with a provider error carrying `status`.
    Fail { status: u16, message: String },
    /// Fails as if the completion were safety-blocked.
    Blocked(String),
}

/// A recorded generation call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub request: ProviderRequest,
    pub streamed: bool,
}

/// FIFO-scripted provider that records every call it receives.
///
/// In streaming mode the reply is delivered word by word, checking the
/// cancellation token (and sleeping `chunk_delay`) between words.
pub struct MockProvider {
    tag: ProviderTag,
    default_model: String,
    streaming: bool,
    chunk_delay: Duration,
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn new(tag: ProviderTag) -> Self {
        Self {
            tag,
            default_model: format!("mock-{tag}"),
            streaming: false,
            chunk_delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses(tag: ProviderTag, responses: Vec<String>) -> Self {
        let provider = Self::new(tag);
        for text in responses {
            provider.push_text(text);
        }
        provider
    }

    pub fn streaming(mut self, chunk_delay: Duration) -> Self {
        self.streaming = true;
        self.chunk_delay = chunk_delay;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn push(&self, reply: MockReply) {
        lock(&self.script).push_back(reply);
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(MockReply::Text(text.into()));
    }

    pub fn push_failure(&self, status: u16, message: impl Into<String>) {
        self.push(MockReply::Fail {
            status,
            message: message.into(),
        });
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }

    fn next(&self, messages: &[Message], request: &ProviderRequest, streamed: bool) -> Result<String, JaniError> {
        lock(&self.calls).push(RecordedCall {
            messages: messages.to_vec(),
            request: request.clone(),
            streamed,
        });
        let reply = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text(DEFAULT_MOCK_REPLY.to_string()));
        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail { status, message } => Err(JaniError::http_status(status, &message)),
            MockReply::Blocked(reason) => Err(JaniError::ContentBlocked { reason }),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, JaniError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn tag(&self) -> ProviderTag {
        self.tag
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn generate_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
    ) -> Result<String, JaniError> {
        self.next(messages, request, false)
    }

    async fn stream_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
        sink: &mut dyn TokenSink,
        cancel: &CancellationToken,
    ) -> Result<Completion, JaniError> {
        if cancel.is_cancelled() {
            return Err(JaniError::Cancelled);
        }
        let text = self.next(messages, request, true)?;
        if !self.streaming {
            sink.on_token(&text);
            return Ok(Completion::from_text(text));
        }

        let mut accumulated = String::new();
        for chunk in text.split_inclusive(' ') {
            if !self.chunk_delay.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(JaniError::Cancelled),
                    () = tokio::time::sleep(self.chunk_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(JaniError::Cancelled);
            }
            sink.on_token(chunk);
            accumulated.push_str(chunk);
        }
        Ok(Completion::from_text(accumulated))
    }
}
