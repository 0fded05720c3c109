// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end orchestrator tests.
//!
//! `TestHarness` wires a [`ChatOrchestrator`] to an [`InMemoryStore`],
//! scripted [`MockProvider`]s and a [`RecordingNotifier`], and exposes
//! `send()` to drive one exchange through the full pipeline.

use std::sync::Arc;

use jani_agent::{ChatOrchestrator, ChatReply, ChatRequest, ProviderRegistry};
use jani_config::JaniConfig;
use jani_core::types::{CharacterId, CharacterRecord, Identity};
use jani_core::{JaniError, ProviderTag};
use tokio_util::sync::CancellationToken;

use crate::mock_provider::MockProvider;
use crate::notifier::RecordingNotifier;
use crate::store::{InMemoryStore, character};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: JaniConfig,
    responses: Vec<String>,
    extra_providers: Vec<Arc<MockProvider>>,
    characters: Vec<CharacterRecord>,
    notifier: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = JaniConfig::default();
        // Extraction would consume scripted responses unless a test opts in.
        config.memory.enabled = false;
        Self {
            config,
            responses: Vec::new(),
            extra_providers: Vec::new(),
            characters: Vec::new(),
            notifier: true,
        }
    }

    /// Responses for the default provider, consumed in order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_config(mut self, config: JaniConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjusts the config in place.
    pub fn configure(mut self, f: impl FnOnce(&mut JaniConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn with_memory(mut self) -> Self {
        self.config.memory.enabled = true;
        self
    }

    /// Registers an additional provider; replaces the default one if tags collide.
    pub fn with_provider(mut self, provider: Arc<MockProvider>) -> Self {
        self.extra_providers.push(provider);
        self
    }

    pub fn with_character(mut self, character: CharacterRecord) -> Self {
        self.characters.push(character);
        self
    }

    pub fn without_notifier(mut self) -> Self {
        self.notifier = false;
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(InMemoryStore::new());
        for character in self.characters {
            store.add_character(character);
        }

        let provider = Arc::new(MockProvider::with_responses(
            self.config.llm.default_provider,
            self.responses,
        ));
        let mut registry = ProviderRegistry::new().with(provider.clone());
        for extra in &self.extra_providers {
            registry.register(extra.clone());
        }

        let notifier = Arc::new(RecordingNotifier::new());
        let mut orchestrator = ChatOrchestrator::new(&self.config, store.clone(), registry);
        if self.notifier {
            orchestrator = orchestrator.with_notifier(notifier.clone());
        }

        TestHarness {
            orchestrator: Arc::new(orchestrator),
            store,
            provider,
            notifier,
            config: self.config,
        }
    }
}

/// A complete orchestrator wired to in-memory collaborators.
pub struct TestHarness {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub store: Arc<InMemoryStore>,
    /// Provider registered under the configured default tag.
    pub provider: Arc<MockProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: JaniConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with a single free character `1` named "Mira".
    pub fn with_default_character() -> Self {
        Self::builder().with_character(character(1, "Mira")).build()
    }

    pub fn identity(external_id: i64) -> Identity {
        Identity {
            external_id,
            username: Some(format!("user{external_id}")),
        }
    }

    /// Sends `text` to `character_id` on behalf of `external_id` without streaming.
    pub async fn send(
        &self,
        external_id: i64,
        character_id: CharacterId,
        text: &str,
    ) -> Result<ChatReply, JaniError> {
        let request = ChatRequest::new(Self::identity(external_id), text).with_character(character_id);
        self.orchestrator
            .process_message(request, None, &CancellationToken::new())
            .await
    }

    /// Streams a request and returns the reply plus every token seen by the sink.
    pub async fn stream(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> (Result<ChatReply, JaniError>, Vec<String>) {
        let mut tokens = Vec::new();
        let result = {
            let mut sink = |t: &str| tokens.push(t.to_string());
            self.orchestrator
                .process_message(request, Some(&mut sink), cancel)
                .await
        };
        (result, tokens)
    }

    pub fn default_tag(&self) -> ProviderTag {
        self.config.llm.default_provider
    }
}
