// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM vendor integrations.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JaniError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Completion, Message, ProviderRequest, ProviderTag};

/// Receives streamed text fragments, once each, in arrival order.
///
/// Called synchronously from the read loop, so a slow sink slows the read.
pub trait TokenSink: Send {
    fn on_token(&mut self, token: &str);
}

impl<F> TokenSink for F
where
    F: FnMut(&str) + Send,
{
    fn on_token(&mut self, token: &str) {
        self(token)
    }
}

/// One LLM vendor behind a common contract.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Registry key for this adapter.
    fn tag(&self) -> ProviderTag;

    /// Model used when the request does not name one.
    fn default_model(&self) -> &str;

    /// Whether [`ProviderAdapter::stream_reply`] delivers incremental tokens.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Sends the prompt and returns the complete reply text.
    async fn generate_reply(
        &self,
        messages: &[Message],
        request: &ProviderRequest,
    ) -> Result<String, JaniError>;

    /// Streams the reply into `sink`, honouring `cancel`.
    ///
    /// Adapters without a streaming wire format fall back to a single
    /// [`generate_reply`](ProviderAdapter::generate_reply) call whose text is
    /// forwarded to the sink once. A token that is already cancelled aborts
    /// before any request is issued.
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
        let text = self.generate_reply(messages, request).await?;
        sink.on_token(&text);
        Ok(Completion::from_text(text))
    }
}
