// SPDX-FileCopyrightText: 2026 Jani Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based extraction of user facts from a finished exchange.
//!
//! Extraction is best-effort: every failure is logged and turns into
//! "nothing extracted". Callers never see an error from this module.

use jani_config::model::MemoryConfig;
use jani_core::traits::{ChatStore, ProviderAdapter};
use jani_core::types::{CharacterId, MemoryCategory, NewMemory, UserId};
use jani_core::{Message, ProviderRequest, Role};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::limit::enforce_memory_limit;

/// Upper bound on facts kept from one extraction call.
pub const MAX_FACTS_PER_EXCHANGE: usize = 3;

/// Number of trailing dialog messages shown to the extraction model.
pub const DIALOG_WINDOW: usize = 6;

/// Importance assigned when the model omits one.
pub const DEFAULT_IMPORTANCE: u8 = 5;

const EXTRACTION_PROMPT: &str = r#"Analyze the conversation and extract NEW FACTS about the user.
Return JSON array of facts. Only include facts NOT already in existing memories.
Each fact: { "content": "short fact", "category": "fact|preference|emotion|relationship", "importance": 1-10 }

Categories:
- fact: objective info (name, job, location)
- preference: likes/dislikes
- emotion: emotional state
- relationship: how they relate to the character

Rules:
- Only extract CLEAR facts explicitly stated by user
- Skip vague or uncertain info
- Importance: 10 = critical (name), 5 = useful, 1 = trivial
- Max 3 facts per exchange
- Return [] if nothing new

Existing memories: {existing}

Conversation:
{dialog}

Return only valid JSON array:"#;

/// A fact proposed by the extraction model that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub content: String,
    pub category: MemoryCategory,
    pub importance: u8,
}

/// Extracts facts with a secondary provider call and stores the new ones.
#[derive(Debug, Clone)]
pub struct MemoryExtractor {
    max_per_pair: usize,
    temperature: f32,
    max_tokens: u32,
}

impl MemoryExtractor {
    pub fn new(max_per_pair: usize, temperature: f32, max_tokens: u32) -> Self {
        Self {
            max_per_pair,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            config.max_per_pair,
            config.extraction_temperature,
            config.extraction_max_tokens,
        )
    }

    pub fn max_per_pair(&self) -> usize {
        self.max_per_pair
    }

    /// Asks the model for new facts about the user.
    ///
    /// `base` supplies the provider and model; sampling is replaced with
    /// the extraction settings.
    pub async fn extract_facts(
        &self,
        provider: &dyn ProviderAdapter,
        base: &ProviderRequest,
        messages: &[Message],
        existing: &[String],
    ) -> Vec<ExtractedFact> {
        let Some(prompt) = build_extraction_prompt(messages, existing) else {
            return Vec::new();
        };

        let request = ProviderRequest {
            provider: base.provider,
            model: base.model.clone(),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..ProviderRequest::default()
        };

        match provider
            .generate_reply(&[Message::user(prompt)], &request)
            .await
        {
            Ok(response) => parse_extraction_response(&response),
            Err(e) => {
                error!(error = %e, "memory extraction failed (non-fatal)");
                Vec::new()
            }
        }
    }

    /// Extracts facts and saves the ones not already known for the pair.
    ///
    /// Returns the number of memories saved. The per-pair cap is enforced
    /// after each insert.
    pub async fn extract_and_save(
        &self,
        store: &dyn ChatStore,
        provider: &dyn ProviderAdapter,
        base: &ProviderRequest,
        user_id: UserId,
        character_id: CharacterId,
        messages: &[Message],
    ) -> usize {
        let mut known: Vec<String> = match store.list_memories(user_id, character_id).await {
            Ok(memories) => memories.into_iter().map(|m| m.content).collect(),
            Err(e) => {
                error!(user_id, character_id, error = %e, "failed to load memories for extraction");
                return 0;
            }
        };

        let facts = self.extract_facts(provider, base, messages, &known).await;
        let mut saved = 0;

        for fact in facts {
            if is_duplicate(&fact.content, &known) {
                debug!(content = %fact.content, "skipping duplicate memory");
                continue;
            }

            let new_memory = NewMemory {
                user_id,
                character_id,
                category: fact.category,
                content: fact.content.clone(),
                importance: fact.importance,
            };
            if let Err(e) = store.add_memory(new_memory).await {
                error!(user_id, character_id, error = %e, "failed to save memory (non-fatal)");
                break;
            }
            saved += 1;
            info!(
                user_id,
                character_id,
                category = %fact.category,
                importance = fact.importance,
                content = %preview(&fact.content),
                "memory auto-saved"
            );

            if let Err(e) =
                enforce_memory_limit(store, user_id, character_id, self.max_per_pair).await
            {
                warn!(user_id, character_id, error = %e, "memory limit enforcement failed");
            }
            known.push(fact.content);
        }

        saved
    }
}

/// Builds the extraction prompt, or `None` when the exchange holds nothing
/// worth analysing.
pub fn build_extraction_prompt(messages: &[Message], existing: &[String]) -> Option<String> {
    let dialog: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();
    if dialog.len() < 2 || !dialog.iter().any(|m| m.role == Role::User) {
        return None;
    }

    let start = dialog.len().saturating_sub(DIALOG_WINDOW);
    let dialog_text = dialog[start..]
        .iter()
        .map(|m| {
            let speaker = if m.role == Role::User { "User" } else { "Assistant" };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let existing_text = if existing.is_empty() {
        "none".to_string()
    } else {
        existing.join("; ")
    };

    Some(
        EXTRACTION_PROMPT
            .replace("{existing}", &existing_text)
            .replace("{dialog}", &dialog_text),
    )
}

/// Parses the model output into validated facts.
///
/// Reads the span from the first `[` to the last `]`. Items that fail
/// validation are dropped individually; malformed output yields nothing.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedFact> {
    let (Some(start), Some(end)) = (response.find('['), response.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    let items = match serde_json::from_str::<Vec<Value>>(&response[start..=end]) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "failed to parse extraction response");
            debug!(response, "raw extraction response");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(validate_fact)
        .take(MAX_FACTS_PER_EXCHANGE)
        .collect()
}

fn validate_fact(item: &Value) -> Option<ExtractedFact> {
    let content = item.get("content")?.as_str()?;
    let length = content.chars().count();
    if !(4..200).contains(&length) {
        return None;
    }

    let category = item.get("category")?.as_str()?.parse().ok()?;

    let importance = match item.get("importance") {
        None | Some(Value::Null) => DEFAULT_IMPORTANCE,
        Some(value) => {
            let n = value.as_f64()?;
            if !(1.0..=10.0).contains(&n) {
                return None;
            }
            n.round() as u8
        }
    };

    Some(ExtractedFact {
        content: content.to_string(),
        category,
        importance,
    })
}

/// Case-insensitive containment in either direction.
fn is_duplicate(candidate: &str, known: &[String]) -> bool {
    let candidate = candidate.to_lowercase();
    known.iter().any(|existing| {
        let existing = existing.to_lowercase();
        existing.contains(&candidate) || candidate.contains(&existing)
    })
}

fn preview(content: &str) -> &str {
    jani_core::error::truncate_chars(content, 50)
}
