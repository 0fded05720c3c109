// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request chat pipeline.
//!
//! Each call to [`ChatOrchestrator::process_message`] walks the states
//! ResolveIdentity -> ResolveCharacter -> Gate -> AssembleHistory ->
//! Invoke -> Commit -> ExtractMemories. Any failure is terminal for the
//! request; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use jani_config::JaniConfig;
use jani_config::model::{ChatConfig, LlmConfig};
use jani_core::cache::replay_cached;
use jani_core::envelope::ActionEnvelope;
use jani_core::types::{
    CharacterId, CharacterRecord, ChatSession, DialogRole, GenerationAlert, Identity,
    NewDialogMessage, UserId, UserRecord,
};
use jani_core::{
    ChatStore, Completion, JaniError, Message, Notifier, PromptCache, ProviderAdapter,
    ProviderRequest, ProviderTag, TokenSink, cache_key,
};
use jani_memory::MemoryExtractor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::prompt::{assemble_prompt, conversation_turns, order_history};
use crate::registry::ProviderRegistry;
use crate::reply::{compose_reply, parse_json_reply, sanitize_reply};

/// States of a single chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    ResolveIdentity,
    ResolveCharacter,
    Gate,
    AssembleHistory,
    Invoke,
    Commit,
    ExtractMemories,
    Done,
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatState::ResolveIdentity => write!(f, "resolve_identity"),
            ChatState::ResolveCharacter => write!(f, "resolve_character"),
            ChatState::Gate => write!(f, "gate"),
            ChatState::AssembleHistory => write!(f, "assemble_history"),
            ChatState::Invoke => write!(f, "invoke"),
            ChatState::Commit => write!(f, "commit"),
            ChatState::ExtractMemories => write!(f, "extract_memories"),
            ChatState::Done => write!(f, "done"),
        }
    }
}

/// An inbound chat message.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub identity: Identity,
    pub text: String,
    /// Explicit character; falls back to the user's last one.
    pub character_id: Option<CharacterId>,
    /// Re-run the last exchange without storing a new user line.
    pub is_regenerate: bool,
    /// Overrides the derived prompt cache key, so prompts the caller knows
    /// to be equivalent share one entry.
    pub cache_key: Option<String>,
}

impl ChatRequest {
    pub fn new(identity: Identity, text: impl Into<String>) -> Self {
        Self {
            identity,
            text: text.into(),
            character_id: None,
            is_regenerate: false,
            cache_key: None,
        }
    }

    pub fn with_character(mut self, character_id: CharacterId) -> Self {
        self.character_id = Some(character_id);
        self
    }

    pub fn regenerate(mut self) -> Self {
        self.is_regenerate = true;
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
}

/// Result of a successful exchange.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Text for the caller: thoughts (if any), a blank line, then the reply.
    pub reply: String,
    /// The reply as stored in the dialog.
    pub stored_reply: String,
    pub character: CharacterRecord,
    pub user_id: UserId,
    pub envelope: Option<ActionEnvelope>,
}

/// Drives the chat pipeline over injected collaborators.
///
/// Shared across requests; holds no per-request state.
pub struct ChatOrchestrator {
    store: Arc<dyn ChatStore>,
    providers: Arc<ProviderRegistry>,
    cache: Arc<PromptCache<Completion>>,
    notifier: Option<Arc<dyn Notifier>>,
    extractor: Option<Arc<MemoryExtractor>>,
    chat: ChatConfig,
    llm: LlmConfig,
    background: TaskTracker,
}

impl ChatOrchestrator {
    pub fn new(config: &JaniConfig, store: Arc<dyn ChatStore>, providers: ProviderRegistry) -> Self {
        let extractor = config
            .memory
            .enabled
            .then(|| Arc::new(MemoryExtractor::from_config(&config.memory)));

        info!(
            providers = ?providers.tags(),
            default_provider = %config.llm.default_provider,
            memory = extractor.is_some(),
            cache_ttl_secs = config.cache.ttl_secs,
            "chat orchestrator initialized"
        );

        Self {
            store,
            providers: Arc::new(providers),
            cache: Arc::new(PromptCache::new(Duration::from_secs(config.cache.ttl_secs))),
            notifier: None,
            extractor,
            chat: config.chat.clone(),
            llm: config.llm.clone(),
            background: TaskTracker::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_cache(mut self, cache: Arc<PromptCache<Completion>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Waits for background work (memory extraction, alerts) spawned so far.
    pub async fn wait_for_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Background tasks still running.
    pub fn background_tasks(&self) -> usize {
        self.background.len()
    }

    /// Runs one exchange end to end.
    ///
    /// With a `sink`, tokens are pushed as they arrive and `cancel` aborts
    /// the provider call. Without one the call is not cancellable.
    pub async fn process_message(
        &self,
        request: ChatRequest,
        sink: Option<&mut dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, JaniError> {
        let mut state = ChatState::ResolveIdentity;
        let user = self
            .store
            .find_or_create_user(
                request.identity.external_id,
                request.identity.username.as_deref(),
            )
            .await?;
        let username = user
            .username
            .clone()
            .or_else(|| request.identity.username.clone());

        advance(&mut state, ChatState::ResolveCharacter, user.id);
        let character_id = self.resolve_character_id(&user, request.character_id).await?;

        advance(&mut state, ChatState::Gate, user.id);
        let character = self.gate(&user, character_id).await?;

        advance(&mut state, ChatState::AssembleHistory, user.id);
        let history = order_history(
            self.store
                .recent_messages(user.id, character.id, self.chat.history_limit)
                .await?,
        );
        let memories = if self.extractor.is_some() {
            self.store.list_memories(user.id, character.id).await?
        } else {
            Vec::new()
        };
        let turns = conversation_turns(&history, &request.text, request.is_regenerate);
        let prompt = assemble_prompt(
            &character.system_prompt,
            &memories,
            turns,
            self.chat.token_budget,
            self.chat.response_reserve,
        );

        advance(&mut state, ChatState::Invoke, user.id);
        let tag = character.provider.unwrap_or(self.llm.default_provider);
        let provider_request = self.provider_request(tag, &character);
        let model = provider_request.model.clone().unwrap_or_default();

        let completion = match self
            .invoke(
                tag,
                &prompt,
                &provider_request,
                request.cache_key.as_deref(),
                request.is_regenerate,
                sink,
                cancel,
            )
            .await
        {
            Ok(completion) => completion,
            Err(JaniError::Cancelled) => {
                info!(user_id = user.id, character_id = character.id, "generation cancelled");
                return Err(JaniError::Cancelled);
            }
            Err(e) => {
                error!(
                    user_id = user.id,
                    character_id = character.id,
                    provider = %tag,
                    model = %model,
                    error = %e,
                    "generation failed"
                );
                self.alert(GenerationAlert {
                    occurred_at: Utc::now(),
                    user_id: user.id,
                    external_id: user.external_id,
                    character_id: character.id,
                    character_name: character.name.clone(),
                    provider: tag,
                    model,
                    user_message: request.text.clone(),
                    error: e.to_string(),
                });
                return Err(JaniError::Generation {
                    message: e.to_string(),
                });
            }
        };

        let visible = completion
            .envelope
            .as_ref()
            .map_or(completion.text.as_str(), |env| env.user_visible_text.as_str());
        let parsed = parse_json_reply(visible);
        let cleaned = sanitize_reply(&parsed.reply, &character.name, username.as_deref());

        advance(&mut state, ChatState::Commit, user.id);
        if request.is_regenerate {
            self.store
                .record_regeneration(user.id, character.id, Utc::now())
                .await?;
        } else {
            self.store
                .append_message(NewDialogMessage {
                    user_id: user.id,
                    character_id: character.id,
                    role: DialogRole::User,
                    text: request.text.clone(),
                })
                .await?;
        }
        self.store
            .append_message(NewDialogMessage {
                user_id: user.id,
                character_id: character.id,
                role: DialogRole::Assistant,
                text: cleaned.clone(),
            })
            .await?;
        self.store.update_last_character(user.id, character.id).await?;

        let mut session = self.store.get_or_create_session(user.id, character.id).await?;
        update_session(&mut session, parsed.delta.total(), parsed.mood.clone(), Utc::now());
        self.store.save_session(&session).await?;

        advance(&mut state, ChatState::ExtractMemories, user.id);
        if let Some(extractor) = &self.extractor {
            let mut exchange: Vec<Message> = prompt
                .iter()
                .filter(|m| m.role != jani_core::Role::System)
                .cloned()
                .collect();
            exchange.push(Message::assistant(cleaned.clone()));
            self.spawn_extraction(extractor.clone(), tag, provider_request, user.id, character.id, exchange);
        }

        advance(&mut state, ChatState::Done, user.id);
        info!(
            user_id = user.id,
            character_id = character.id,
            regenerate = request.is_regenerate,
            reply_len = cleaned.len(),
            relationship = session.relationship_score(),
            "exchange completed"
        );

        Ok(ChatReply {
            reply: compose_reply(parsed.thoughts.as_deref(), &cleaned),
            stored_reply: cleaned,
            character,
            user_id: user.id,
            envelope: completion.envelope,
        })
    }

    async fn resolve_character_id(
        &self,
        user: &UserRecord,
        explicit: Option<CharacterId>,
    ) -> Result<CharacterId, JaniError> {
        if let Some(id) = explicit.or(user.last_character_id) {
            return Ok(id);
        }
        self.store
            .last_conversed_character(user.id)
            .await?
            .ok_or(JaniError::CharacterRequired)
    }

    /// Existence, entitlement and daily-limit checks.
    async fn gate(
        &self,
        user: &UserRecord,
        character_id: CharacterId,
    ) -> Result<CharacterRecord, JaniError> {
        let character = match self.store.get_character(character_id).await? {
            Some(c) if c.is_active => c,
            _ => return Err(JaniError::CharacterInactive { character_id }),
        };

        let subscribed = self.store.has_active_subscription(user.id).await?;
        if character.is_premium() && !subscribed {
            return Err(JaniError::PremiumRequired { character_id });
        }

        if self.chat.enable_message_limit && !subscribed {
            let limit = self.chat.free_daily_message_limit;
            let since = start_of_day(Utc::now());
            let messages = self.store.count_user_messages_since(user.id, since).await?;
            let regenerations = self.store.count_regenerations_since(user.id, since).await?;
            let used = messages.saturating_add(regenerations);
            if used >= limit {
                warn!(user_id = user.id, used, limit, "daily message limit reached");
                return Err(JaniError::LimitReached { used, limit });
            }
        }

        Ok(character)
    }

    /// Character overrides on top of the `[chat]` sampling defaults.
    fn provider_request(&self, tag: ProviderTag, character: &CharacterRecord) -> ProviderRequest {
        let model = character
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| {
                self.providers
                    .get(tag)
                    .ok()
                    .map(|p| p.default_model().to_string())
            });
        ProviderRequest {
            provider: tag,
            model,
            temperature: Some(character.temperature.unwrap_or(self.chat.temperature)),
            top_p: Some(self.chat.top_p),
            repetition_penalty: Some(self.chat.repetition_penalty),
            max_tokens: u32::try_from(self.chat.response_reserve).ok(),
            stop: self.chat.stop_sequences.clone(),
        }
    }

    async fn invoke(
        &self,
        tag: ProviderTag,
        prompt: &[Message],
        request: &ProviderRequest,
        explicit_key: Option<&str>,
        bypass_cache: bool,
        sink: Option<&mut dyn TokenSink>,
        cancel: &CancellationToken,
    ) -> Result<Completion, JaniError> {
        let provider: Arc<dyn ProviderAdapter> = self.providers.get(tag)?;
        let key = match explicit_key {
            Some(key) => key.to_string(),
            None => cache_key(request.model.as_deref().unwrap_or_default(), prompt),
        };

        if !bypass_cache && let Some(cached) = self.cache.get(&key) {
            debug!(provider = %tag, "prompt cache hit");
            replay_cached(&cached, sink);
            return Ok(cached);
        }

        let completion = match sink {
            Some(sink) => provider.stream_reply(prompt, request, sink, cancel).await?,
            None => Completion::from_text(provider.generate_reply(prompt, request).await?),
        };
        if completion.text.trim().is_empty() {
            return Err(JaniError::EmptyResponse {
                provider: tag.to_string(),
            });
        }
        self.cache.set(key, completion.clone());
        Ok(completion)
    }

    fn alert(&self, alert: GenerationAlert) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        self.background.spawn(async move {
            notifier.notify_generation_failure(&alert).await;
        });
    }

    fn spawn_extraction(
        &self,
        extractor: Arc<MemoryExtractor>,
        tag: ProviderTag,
        request: ProviderRequest,
        user_id: UserId,
        character_id: CharacterId,
        exchange: Vec<Message>,
    ) {
        let Ok(provider) = self.providers.get(tag) else {
            return;
        };
        let store = self.store.clone();
        self.background.spawn(async move {
            let saved = extractor
                .extract_and_save(
                    store.as_ref(),
                    provider.as_ref(),
                    &request,
                    user_id,
                    character_id,
                    &exchange,
                )
                .await;
            if saved > 0 {
                debug!(user_id, character_id, saved, "memories extracted");
            }
        });
    }
}

fn advance(state: &mut ChatState, next: ChatState, user_id: UserId) {
    debug!(user_id, from = %state, to = %next, "chat state transition");
    *state = next;
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Applies the bookkeeping of one completed exchange to the session row.
pub fn update_session(
    session: &mut ChatSession,
    delta: i32,
    mood: Option<String>,
    at: DateTime<Utc>,
) {
    session.record_message(at);
    session.adjust_relationship(delta);
    if mood.is_some() {
        session.mood = mood;
    }
}
